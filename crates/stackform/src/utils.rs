//! Utilities for working with `stackform`.

fn hex(digest: ring::digest::Digest) -> String {
    data_encoding::HEXUPPER.encode(digest.as_ref())
}

/// Returns the sha256 digest of the file at the given path *if it exists*.
/// If the file does _not_ exist it returns `Ok(None)`.
pub fn sha256_digest(path: impl AsRef<std::path::Path>) -> anyhow::Result<Option<String>> {
    log::trace!("determining sha256 of {}", path.as_ref().display());
    if !path.as_ref().is_file() {
        return Ok(None);
    }

    fn sha256<R: std::io::Read>(mut reader: R) -> anyhow::Result<ring::digest::Digest> {
        let mut context = ring::digest::Context::new(&ring::digest::SHA256);
        let mut buffer = [0; 1024];

        loop {
            let count = reader.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            context.update(&buffer[..count]);
        }

        Ok(context.finish())
    }

    let input = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(input);
    let digest = sha256(reader)?;
    Ok(Some(hex(digest)))
}

/// Returns the sha256 digest of some bytes.
pub fn sha256_bytes(bytes: impl AsRef<[u8]>) -> String {
    hex(ring::digest::digest(&ring::digest::SHA256, bytes.as_ref()))
}

/// Reduces a name to the characters allowed in a logical id.
pub fn logical_id_of(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_has_no_digest() {
        assert!(sha256_digest("does/not/exist.zip").unwrap().is_none());
    }

    #[test]
    fn file_digest_matches_bytes_digest() {
        let path = std::env::temp_dir().join("stackform-digest-test.txt");
        std::fs::write(&path, b"hello lambda").unwrap();
        let from_file = sha256_digest(&path).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(sha256_bytes("hello lambda"), from_file);
    }

    #[test]
    fn logical_ids_are_alphanumeric() {
        assert_eq!("ordersservicerole", logical_id_of("orders-service_role"));
        assert_eq!("vLatest", logical_id_of("vLatest"));
    }
}
