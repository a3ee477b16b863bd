use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

const CHUNK: usize = 64 * 1024;

/// Content fingerprint of a local file (`b3-<hex>`).
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}

pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("b3-{}", &hasher.finalize().to_hex()[..32]))
}
