use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::{decompress_to_vec_zlib_with_limit, TINFLStatus};
use tracing::trace;

use crate::error::{FilterError, Result};

/// zlib level used when none is given (1-10, higher = better ratio, slower).
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// Highest accepted zlib level.
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

/// Default cap on inflated output: 16 MiB, matching the frame payload cap.
pub const DEFAULT_MAX_DECOMPRESSED: usize = 16 * 1024 * 1024;

/// A payload transform stage.
///
/// The set of stages is closed; every variant honours the same contract:
/// `decode(encode(x)) == x` for a matching pair of stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Pass bytes through untouched.
    Identity,
    /// zlib-compress on encode, inflate on decode.
    Compress { level: u8 },
    /// Inflate on decode (bounded by `max_output`), zlib-compress on encode.
    Decompress { max_output: usize },
}

impl Filter {
    /// Compression stage at an explicit level.
    pub fn compress(level: u8) -> Result<Self> {
        if level > MAX_COMPRESSION_LEVEL {
            return Err(FilterError::InvalidLevel(level));
        }
        Ok(Filter::Compress { level })
    }

    /// Decompression stage with the default output cap.
    pub fn decompress() -> Self {
        Filter::Decompress {
            max_output: DEFAULT_MAX_DECOMPRESSED,
        }
    }

    /// Stable stage name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Identity => "identity",
            Filter::Compress { .. } => "compress",
            Filter::Decompress { .. } => "decompress",
        }
    }

    /// Apply this stage's encode step.
    pub fn encode(&self, input: Bytes) -> Result<Bytes> {
        match *self {
            Filter::Identity => Ok(input),
            Filter::Compress { level } => Ok(deflate(&input, level)),
            Filter::Decompress { .. } => Ok(deflate(&input, DEFAULT_COMPRESSION_LEVEL)),
        }
    }

    /// Apply this stage's decode step.
    pub fn decode(&self, input: Bytes) -> Result<Bytes> {
        match *self {
            Filter::Identity => Ok(input),
            Filter::Compress { .. } => inflate(self.name(), &input, DEFAULT_MAX_DECOMPRESSED),
            Filter::Decompress { max_output } => inflate(self.name(), &input, max_output),
        }
    }
}

fn deflate(input: &[u8], level: u8) -> Bytes {
    let out = compress_to_vec_zlib(input, level);
    trace!(input = input.len(), output = out.len(), level, "deflated payload");
    Bytes::from(out)
}

fn inflate(filter: &'static str, input: &[u8], max_output: usize) -> Result<Bytes> {
    match decompress_to_vec_zlib_with_limit(input, max_output) {
        Ok(out) => {
            trace!(input = input.len(), output = out.len(), "inflated payload");
            Ok(Bytes::from(out))
        }
        Err(err) if err.status == TINFLStatus::HasMoreOutput => Err(FilterError::OutputLimit {
            filter,
            position: 0,
            max: max_output,
        }),
        Err(err) => Err(FilterError::Corrupt {
            filter,
            position: 0,
            detail: format!("{:?}", err.status),
        }),
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Identity => write!(f, "identity"),
            Filter::Compress { level } => write!(f, "compress:{level}"),
            Filter::Decompress { max_output } if *max_output == DEFAULT_MAX_DECOMPRESSED => {
                write!(f, "decompress")
            }
            Filter::Decompress { max_output } => write!(f, "decompress:{max_output}"),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    /// Parse `identity`, `compress`, `compress:<level>`, `decompress` or
    /// `decompress:<max-output-bytes>`.
    fn from_str(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (spec, None),
        };

        match (name, arg) {
            ("identity", None) => Ok(Filter::Identity),
            ("compress", None) => Filter::compress(DEFAULT_COMPRESSION_LEVEL),
            ("compress", Some(level)) => {
                let level = level
                    .parse::<u8>()
                    .map_err(|_| FilterError::Parse(format!("bad compression level in '{spec}'")))?;
                Filter::compress(level)
            }
            ("decompress", None) => Ok(Filter::decompress()),
            ("decompress", Some(max)) => {
                let max_output = max
                    .parse::<usize>()
                    .map_err(|_| FilterError::Parse(format!("bad output limit in '{spec}'")))?;
                Ok(Filter::Decompress { max_output })
            }
            _ => Err(FilterError::Parse(format!("unknown filter '{spec}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bytes {
        Bytes::from("the quick brown fox jumps over the lazy dog. ".repeat(40))
    }

    #[test]
    fn identity_passes_through() {
        let input = sample();
        assert_eq!(Filter::Identity.encode(input.clone()).unwrap(), input);
        assert_eq!(Filter::Identity.decode(input.clone()).unwrap(), input);
    }

    #[test]
    fn compress_shrinks_repetitive_payload() {
        let input = sample();
        let encoded = Filter::compress(9).unwrap().encode(input.clone()).unwrap();
        assert!(encoded.len() < input.len());
    }

    #[test]
    fn compress_pairs_with_decompress() {
        let input = sample();
        let encoded = Filter::compress(1).unwrap().encode(input.clone()).unwrap();
        let decoded = Filter::decompress().decode(encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn decompress_encode_is_inverse_of_its_decode() {
        let input = sample();
        let filter = Filter::decompress();
        assert_eq!(filter.decode(filter.encode(input.clone()).unwrap()).unwrap(), input);
    }

    #[test]
    fn empty_payload_roundtrips() {
        let encoded = Filter::compress(6).unwrap().encode(Bytes::new()).unwrap();
        assert!(!encoded.is_empty(), "zlib stream has a header even for empty input");
        let decoded = Filter::decompress().decode(encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn corrupt_input_rejected() {
        let err = Filter::decompress()
            .decode(Bytes::from_static(b"definitely not zlib"))
            .unwrap_err();
        assert!(matches!(err, FilterError::Corrupt { filter: "decompress", .. }));
    }

    #[test]
    fn output_limit_enforced() {
        let encoded = Filter::compress(6).unwrap().encode(sample()).unwrap();
        let err = Filter::Decompress { max_output: 64 }
            .decode(encoded)
            .unwrap_err();
        assert!(matches!(err, FilterError::OutputLimit { max: 64, .. }));
    }

    #[test]
    fn invalid_level_rejected() {
        assert_eq!(Filter::compress(11), Err(FilterError::InvalidLevel(11)));
    }

    #[test]
    fn parse_specs() {
        assert_eq!("identity".parse::<Filter>().unwrap(), Filter::Identity);
        assert_eq!(
            "compress".parse::<Filter>().unwrap(),
            Filter::Compress {
                level: DEFAULT_COMPRESSION_LEVEL
            }
        );
        assert_eq!(
            " compress:3 ".parse::<Filter>().unwrap(),
            Filter::Compress { level: 3 }
        );
        assert_eq!("decompress".parse::<Filter>().unwrap(), Filter::decompress());
        assert_eq!(
            "decompress:1024".parse::<Filter>().unwrap(),
            Filter::Decompress { max_output: 1024 }
        );
        assert!("compress:x".parse::<Filter>().is_err());
        assert!("compress:42".parse::<Filter>().is_err());
        assert!("gzip".parse::<Filter>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for filter in [
            Filter::Identity,
            Filter::Compress { level: 4 },
            Filter::decompress(),
            Filter::Decompress { max_output: 99 },
        ] {
            assert_eq!(filter.to_string().parse::<Filter>().unwrap(), filter);
        }
    }
}
