use std::collections::HashSet;

use crate::compress::Compression;

/// Selects a compression scheme from an `Accept-Encoding` header value.
///
/// Each comma separated token is `name[;q=value]`, the quality defaulting to
/// `1`. The first token with the strictly highest quality among
/// `identity`, `gzip`, `zlib`, `bzip2` and `lz4` wins; unknown names weigh
/// nothing. When the quality declared for `*` outweighs every named scheme
/// and `gzip` was not named at all, gzip is chosen. A bare `*` declares
/// nothing.
///
/// ```
/// use micro_exchange::compress::{requested_compression, Compression};
///
/// assert_eq!(requested_compression(Some("gzip;q=0.5, zlib;q=0.8")), Compression::Zlib);
/// assert_eq!(requested_compression(Some("*;q=1")), Compression::Gzip);
/// assert_eq!(requested_compression(None), Compression::None);
/// ```
pub fn requested_compression(accept_encoding: Option<&str>) -> Compression {
    let Some(accept_encoding) = accept_encoding else {
        return Compression::None;
    };

    let mut max_q = 0.0_f64;
    let mut wildcard_q = 0.0_f64;
    let mut named = HashSet::new();
    let mut compression = Compression::None;

    for token in accept_encoding.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (name, params) = token.split_once(';').unwrap_or((token, ""));
        let name = name.trim().to_ascii_lowercase();
        let declared = quality(params);
        let mut q = declared.unwrap_or(1.0);

        if let Some(declared) = declared.filter(|_| name == "*") {
            wildcard_q = declared;
        }

        if max_q < q {
            compression = match name.as_str() {
                "identity" => Compression::None,
                "gzip" => Compression::Gzip,
                "zlib" => Compression::Zlib,
                "bzip2" => Compression::Bzip2,
                "lz4" => Compression::Lz4,
                _ => {
                    q = 0.0;
                    compression
                }
            };
        }

        if max_q < q {
            max_q = q;
        }

        named.insert(name);
    }

    if max_q < wildcard_q && !named.contains("gzip") {
        compression = Compression::Gzip;
    }

    compression
}

/// Reads a non-empty `q=` parameter, `0` when unparsable.
fn quality(params: &str) -> Option<f64> {
    params
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("q=").or_else(|| p.strip_prefix("Q=")))
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| q.parse::<f64>().unwrap_or(0.0))
}
