//! Spatial setup: node geography and mobility
//!
//! A scenario runs over a set of nodes (jurisdictions). The geodata table
//! gives each node a name and a population; the mobility matrix gives daily
//! travel volume between nodes. Node names are kept as strings throughout:
//! geoids routinely carry leading zeros.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{EngineError, Result};

/// Node names, populations and the node-to-node mobility matrix
#[derive(Debug, Clone)]
pub struct Geography {
    names: Vec<String>,
    populations: Vec<u64>,
    /// Daily travelers from row node to column node
    mobility: Vec<Vec<f64>>,
}

/// Mobility expressed as resident fractions, precomputed for the
/// transmission step
#[derive(Debug, Clone)]
pub struct Commuting {
    /// `fractions[i][j]`: share of node i residents traveling to node j
    pub fractions: Vec<Vec<f64>>,
    /// Row sums of `fractions`
    pub away: Vec<f64>,
}

impl Geography {
    /// Build from already-parsed parts, running the full validation
    pub fn from_parts(
        names: Vec<String>,
        populations: Vec<u64>,
        mobility: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let geo = Self {
            names,
            populations,
            mobility,
        };
        geo.validate()?;
        Ok(geo)
    }

    /// Load geodata and mobility from disk
    pub fn load(
        geodata_path: &Path,
        mobility_path: &Path,
        nodenames_key: &str,
        popnodes_key: &str,
    ) -> Result<Self> {
        let geodata = File::open(geodata_path).map_err(|e| {
            EngineError::Geodata(format!("cannot open {}: {e}", geodata_path.display()))
        })?;
        let (names, populations) = read_geodata(geodata, nodenames_key, popnodes_key)?;

        let mobility_file = File::open(mobility_path).map_err(|e| {
            EngineError::Mobility(format!("cannot open {}: {e}", mobility_path.display()))
        })?;
        let mobility = read_mobility(mobility_file)?;

        Self::from_parts(names, populations, mobility)
    }

    fn validate(&self) -> Result<()> {
        let n = self.names.len();

        let mut seen = HashSet::new();
        for name in &self.names {
            if !seen.insert(name.as_str()) {
                return Err(EngineError::Geodata(format!(
                    "duplicate node name '{name}' in geodata"
                )));
            }
        }

        if self.mobility.len() != n || self.mobility.iter().any(|row| row.len() != n) {
            let rows = self.mobility.len();
            let cols = self.mobility.first().map_or(0, Vec::len);
            return Err(EngineError::Mobility(format!(
                "mobility matrix must be {n}x{n} to match geodata, got {rows}x{cols}"
            )));
        }

        // Nobody can travel out of a node faster than its population
        let mut violations = String::new();
        for (i, row) in self.mobility.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                if value < 0.0 {
                    return Err(EngineError::Mobility(format!(
                        "mobility ({i}, {j}) is negative: {value}"
                    )));
                }
                if value > self.populations[i] as f64 {
                    violations.push_str(&format!(
                        "\n({i}, {j}) = {value} > population of '{}' = {}",
                        self.names[i], self.populations[i]
                    ));
                }
            }
        }
        if !violations.is_empty() {
            return Err(EngineError::Mobility(format!(
                "mobility entries exceed the source node population:{violations}"
            )));
        }

        Ok(())
    }

    pub fn nnodes(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn populations(&self) -> &[u64] {
        &self.populations
    }

    pub fn mobility(&self) -> &[Vec<f64>] {
        &self.mobility
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn total_population(&self) -> u64 {
        self.populations.iter().sum()
    }

    /// Resident travel fractions, used to mix forces of infection between
    /// nodes. Zero-population nodes get all-zero rows.
    pub fn commuting(&self) -> Commuting {
        let mut fractions = Vec::with_capacity(self.nnodes());
        let mut away = Vec::with_capacity(self.nnodes());
        for (i, row) in self.mobility.iter().enumerate() {
            let pop = self.populations[i] as f64;
            let frac: Vec<f64> = if pop > 0.0 {
                row.iter().map(|&m| m / pop).collect()
            } else {
                vec![0.0; row.len()]
            };
            away.push(frac.iter().sum());
            fractions.push(frac);
        }
        Commuting { fractions, away }
    }
}

/// Parse the geodata CSV: one row per node, with configurable name and
/// population columns
pub fn read_geodata<R: Read>(
    reader: R,
    nodenames_key: &str,
    popnodes_key: &str,
) -> Result<(Vec<String>, Vec<u64>)> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();

    let col = |key: &str| {
        headers.iter().position(|h| h == key).ok_or_else(|| {
            EngineError::Geodata(format!(
                "'{key}' does not correspond to a column in geodata"
            ))
        })
    };
    let name_col = col(nodenames_key)?;
    let pop_col = col(popnodes_key)?;

    let mut names = Vec::new();
    let mut populations = Vec::new();
    for (i, record) in csv.records().enumerate() {
        let record = record?;
        let row = i + 2; // 1-based, counting the header
        let name = record.get(name_col).unwrap_or("").trim();
        if name.is_empty() {
            return Err(EngineError::Geodata(format!("empty node name in row {row}")));
        }
        let pop_text = record.get(pop_col).unwrap_or("").trim();
        let pop: u64 = pop_text.parse().map_err(|_| {
            EngineError::Geodata(format!(
                "invalid population '{pop_text}' for node '{name}' in row {row}"
            ))
        })?;
        names.push(name.to_string());
        populations.push(pop);
    }

    if names.is_empty() {
        return Err(EngineError::Geodata("geodata contains no nodes".to_string()));
    }
    Ok((names, populations))
}

/// Parse a whitespace-separated mobility matrix
pub fn read_mobility<R: Read>(mut reader: R) -> Result<Vec<Vec<f64>>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut matrix = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    EngineError::Mobility(format!(
                        "invalid value '{tok}' in mobility line {}",
                        lineno + 1
                    ))
                })
            })
            .collect::<Result<_>>()?;
        matrix.push(row);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEODATA: &str = "geoid,population\n06037,1000\n06075,500\n";

    fn two_node_geography() -> Geography {
        let (names, pops) = read_geodata(GEODATA.as_bytes(), "geoid", "population").unwrap();
        let mobility = read_mobility("0 50\n20 0\n".as_bytes()).unwrap();
        Geography::from_parts(names, pops, mobility).unwrap()
    }

    #[test]
    fn test_read_geodata_keeps_leading_zeros() {
        let geo = two_node_geography();
        assert_eq!(geo.names(), &["06037".to_string(), "06075".to_string()]);
        assert_eq!(geo.populations(), &[1000, 500]);
        assert_eq!(geo.index_of("06075"), Some(1));
        assert_eq!(geo.total_population(), 1500);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = read_geodata(GEODATA.as_bytes(), "geoid", "pop").unwrap_err();
        assert!(err.to_string().contains("'pop'"));
    }

    #[test]
    fn test_duplicate_node_names_rejected() {
        let data = "geoid,population\na,10\na,20\n";
        let (names, pops) = read_geodata(data.as_bytes(), "geoid", "population").unwrap();
        let err = Geography::from_parts(names, pops, vec![vec![0.0; 2]; 2]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_mobility_shape_checked() {
        let (names, pops) = read_geodata(GEODATA.as_bytes(), "geoid", "population").unwrap();
        let err = Geography::from_parts(names, pops, vec![vec![0.0; 2]]).unwrap_err();
        assert!(err.to_string().contains("2x2"));
    }

    #[test]
    fn test_mobility_exceeding_population_lists_entries() {
        let (names, pops) = read_geodata(GEODATA.as_bytes(), "geoid", "population").unwrap();
        let mobility = vec![vec![0.0, 2000.0], vec![600.0, 0.0]];
        let err = Geography::from_parts(names, pops, mobility).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(0, 1) = 2000"));
        assert!(msg.contains("(1, 0) = 600"));
    }

    #[test]
    fn test_commuting_fractions() {
        let geo = two_node_geography();
        let commuting = geo.commuting();
        assert!((commuting.fractions[0][1] - 0.05).abs() < 1e-12);
        assert!((commuting.fractions[1][0] - 0.04).abs() < 1e-12);
        assert!((commuting.away[0] - 0.05).abs() < 1e-12);
    }
}
