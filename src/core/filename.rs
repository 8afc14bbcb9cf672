//! Identity extraction from artifact file names.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::model::Platform;

fn module_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^",
            r"(?:terraform-)?",
            r"(?P<provider>[a-zA-Z0-9]|[a-zA-Z0-9][_.a-zA-Z0-9]*[a-zA-Z0-9])",
            r"-(?P<name>[a-zA-Z0-9]|[a-zA-Z0-9][-_.a-zA-Z0-9]*[a-zA-Z0-9])",
            r"-(?P<version>\d+\.\d+\.\d+)",
            r"\.(?:tar\.gz|tgz)",
            r"$",
        ))
        .expect("module file name pattern is valid")
    })
}

/// Fields captured from a module archive name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFileName {
    pub provider: String,
    pub name: String,
    pub version: String,
}

/// Parse `[terraform-]<provider>-<name>-<x.y.z>.(tar.gz|tgz)`.
///
/// Files that do not follow the convention yield `None` and are skipped by
/// the caller.
pub fn parse_module_filename(filename: &str) -> Option<ModuleFileName> {
    let caps = module_file_regex().captures(filename)?;
    Some(ModuleFileName {
        provider: caps["provider"].to_string(),
        name: caps["name"].to_string(),
        version: caps["version"].to_string(),
    })
}

/// Fields of a provider release asset, `<tool>_<version>_<os>_<arch>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAssetName {
    pub tool: String,
    pub version: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed asset file {name:?}: expected <tool>_<version>_<os>_<arch>.<ext>")]
pub struct MalformedAssetName {
    pub name: String,
}

/// Parse a provider asset name. Unlike module names a mismatch is an error:
/// the release that carries the asset cannot be trusted.
pub fn parse_provider_asset(filename: &str) -> Result<ProviderAssetName, MalformedAssetName> {
    let stem = match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    };

    let malformed = || MalformedAssetName {
        name: filename.to_string(),
    };

    let parts: Vec<&str> = stem.split('_').collect();
    let [tool, version, os, arch] = parts.as_slice() else {
        return Err(malformed());
    };
    if os.is_empty() || arch.is_empty() {
        return Err(malformed());
    }

    Ok(ProviderAssetName {
        tool: tool.to_string(),
        version: version.to_string(),
        platform: Platform::new(*os, *arch),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_filename_round_trip() {
        let cases = [
            ("aws", "vpc", "1.2.3"),
            ("google", "network", "0.0.1"),
            ("azurerm", "storage-account", "10.20.30"),
            ("a", "b", "1.0.0"),
            ("my_cloud", "db.cluster", "2.11.0"),
            ("x1", "multi-part-name", "0.1.99"),
        ];

        for (provider, name, version) in cases {
            for prefix in ["terraform-", ""] {
                for ext in ["tar.gz", "tgz"] {
                    let filename = format!("{prefix}{provider}-{name}-{version}.{ext}");
                    let parsed = parse_module_filename(&filename)
                        .unwrap_or_else(|| panic!("{filename} should match"));
                    assert_eq!(parsed.provider, provider, "{filename}");
                    assert_eq!(parsed.name, name, "{filename}");
                    assert_eq!(parsed.version, version, "{filename}");
                }
            }
        }
    }

    #[test]
    fn test_module_filename_scenario() {
        let parsed = parse_module_filename("terraform-aws-vpc-1.2.3.tar.gz").unwrap();
        assert_eq!(
            parsed,
            ModuleFileName {
                provider: "aws".to_string(),
                name: "vpc".to_string(),
                version: "1.2.3".to_string(),
            }
        );
    }

    #[test]
    fn test_module_filename_rejects() {
        for filename in [
            "terraform-aws-vpc-1.2.tar.gz",
            "terraform-aws-vpc-1.2.3.zip",
            "terraform-aws-vpc-v1.2.3.tar.gz",
            "terraform-aws--1.2.3.tar.gz",
            "terraform-aws-vpc--1.2.3.tar.gz",
            "README.md",
            "vpc-1.2.3.tar.gz",
            "",
        ] {
            assert_eq!(parse_module_filename(filename), None, "{filename}");
        }
    }

    #[test]
    fn test_provider_asset() {
        let parsed = parse_provider_asset("tool_1.0.0_linux_amd64.zip").unwrap();
        assert_eq!(parsed.tool, "tool");
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.platform, Platform::new("linux", "amd64"));
    }

    #[test]
    fn test_provider_asset_malformed() {
        for filename in [
            "tool_1.0.0_linux.zip",
            "tool_1.0.0_linux_amd64_extra.zip",
            "terraform-provider-tool_1.0.0_linux_amd64",
            "tool_1.0.0__amd64.zip",
            "tool.zip",
        ] {
            let err = parse_provider_asset(filename).unwrap_err();
            assert_eq!(err.name, filename);
        }
    }
}
