//! Gemeinsame Typen fuer das Kryptografie-Subsystem

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_gibt_keinen_inhalt_preis() {
        let geheim = SecretBytes::new(vec![0xAB; 16]);
        let ausgabe = format!("{geheim:?}");
        assert!(ausgabe.contains("REDACTED"));
        assert!(!ausgabe.to_lowercase().contains("ab, ab"));
        assert!(ausgabe.contains("16 bytes"));
    }
}
