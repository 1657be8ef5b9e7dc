//! Built-in TLD to RDAP endpoint mappings.

use crate::error::ProspectError;
use std::collections::HashMap;

/// Known RDAP base URLs, each ending in `/domain/`.
pub fn get_rdap_registry_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        (
            "org",
            "https://rdap.publicinterestregistry.org/rdap/domain/",
        ),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        // Google TLDs
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        // CentralNic
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        // Identity Digital
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        // ccTLDs
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("br", "https://rdap.registro.br/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
    ])
}

/// TLDs with a built-in RDAP endpoint, sorted.
pub fn get_all_known_tlds() -> Vec<&'static str> {
    let mut tlds: Vec<&'static str> = get_rdap_registry_map().into_keys().collect();
    tlds.sort_unstable();
    tlds
}

/// Normalize a user-supplied RDAP base URL so that `{base}{domain}` is a
/// valid lookup URL.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ProspectError> {
    let endpoint = endpoint.trim();
    if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
        return Err(ProspectError::config(format!(
            "RDAP endpoint '{}' must be an http(s) URL",
            endpoint
        )));
    }

    if endpoint.ends_with('/') {
        Ok(endpoint.to_string())
    } else {
        Ok(format!("{}/", endpoint))
    }
}

/// Pick the RDAP base URL for `tld`: an explicit override if given,
/// otherwise the built-in mapping.
///
/// An unknown TLD is a configuration error.
pub fn resolve_rdap_endpoint(tld: &str, explicit: Option<&str>) -> Result<String, ProspectError> {
    if let Some(endpoint) = explicit {
        return normalize_endpoint(endpoint);
    }

    let tld = tld.to_lowercase();
    get_rdap_registry_map()
        .get(tld.as_str())
        .map(|endpoint| endpoint.to_string())
        .ok_or_else(|| {
            ProspectError::config(format!(
                "No known RDAP endpoint for '.{}'. Pass --rdap-endpoint or use the WHOIS oracle",
                tld
            ))
        })
}
