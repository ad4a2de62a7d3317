use std::fmt;

/// A fully-qualified domain name in canonical form.
///
/// Canonical means ASCII-lowercased and terminated with the root-label dot
/// (`example.com.`, RFC 1035). Every constructor normalizes, so two `Fqdn`s
/// compare equal whenever they name the same domain, regardless of how the
/// name was spelled at the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqdn(String);

impl Fqdn {
    pub fn new(name: &str) -> Self {
        let mut canonical = name.trim().to_ascii_lowercase();
        if !canonical.ends_with('.') {
            canonical.push('.');
        }
        Fqdn(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fqdn {
    fn from(name: &str) -> Self {
        Fqdn::new(name)
    }
}

impl From<String> for Fqdn {
    fn from(name: String) -> Self {
        Fqdn::new(&name)
    }
}
