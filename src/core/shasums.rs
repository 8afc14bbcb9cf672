//! `SHA256SUMS` manifest parsing and asset cross-referencing.

use std::collections::HashMap;

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shasum {
    pub sum: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SHASUMS line {line}: {content:?}")]
pub struct InvalidShasumsLine {
    /// 1-based line number
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("file referenced by SHASUMS not found in release assets: {file:?}")]
pub struct DanglingReference {
    pub file: String,
}

/// Parse manifest text into ordered `(sum, file)` entries.
///
/// Blank lines are ignored. Any other line must hold exactly two
/// whitespace separated fields, otherwise the whole manifest is rejected.
pub fn parse_shasums(text: &str) -> Result<Vec<Shasum>, InvalidShasumsLine> {
    let mut sums = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [sum, file] = fields.as_slice() else {
            return Err(InvalidShasumsLine {
                line: idx + 1,
                content: line.to_string(),
            });
        };

        sums.push(Shasum {
            sum: sum.to_string(),
            file: file.to_string(),
        });
    }

    Ok(sums)
}

/// Resolve every manifest entry to its release asset.
///
/// The first entry without a matching asset fails the whole release.
pub fn cross_reference<'a, A>(
    sums: &'a [Shasum],
    assets_by_name: &'a HashMap<String, A>,
) -> Result<Vec<(&'a Shasum, &'a A)>, DanglingReference> {
    sums.iter()
        .map(|sum| {
            assets_by_name
                .get(&sum.file)
                .map(|asset| (sum, asset))
                .ok_or_else(|| DanglingReference {
                    file: sum.file.clone(),
                })
        })
        .collect()
}
