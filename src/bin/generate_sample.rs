//! Writes a synthetic `effectifs.csv` with the layout of the real extract:
//! every pathology × age bracket × sex × region stratum, plus the "tous âges",
//! "tous sexes" and region 99 aggregate rows.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

const PATHOLOGIES: [(&str, f64); 3] = [
    ("Maladies psychiatriques", 2_100.0),
    ("Maladies cardioneurovasculaires", 5_200.0),
    ("Cancers", 3_300.0),
];

const AGES: [&str; 20] = [
    "de 0 à 4 ans",
    "de 5 à 9 ans",
    "de 10 à 14 ans",
    "de 15 à 19 ans",
    "de 20 à 24 ans",
    "de 25 à 29 ans",
    "de 30 à 34 ans",
    "de 35 à 39 ans",
    "de 40 à 44 ans",
    "de 45 à 49 ans",
    "de 50 à 54 ans",
    "de 55 à 59 ans",
    "de 60 à 64 ans",
    "de 65 à 69 ans",
    "de 70 à 74 ans",
    "de 75 à 79 ans",
    "de 80 à 84 ans",
    "de 85 à 89 ans",
    "de 90 à 94 ans",
    "plus de 95 ans",
];

const SEXES: [&str; 2] = ["hommes", "femmes"];

/// Region codes with a rough population weight.
const REGIONS: [(i64, f64); 13] = [
    (11, 12.3),
    (24, 2.6),
    (27, 2.8),
    (28, 3.3),
    (32, 6.0),
    (44, 5.6),
    (52, 3.8),
    (53, 3.4),
    (75, 6.0),
    (76, 6.0),
    (84, 8.1),
    (93, 5.1),
    (94, 0.3),
];

const ALL_AGES: &str = "tous âges";
const ALL_SEXES: &str = "tous sexes";
const UNDETERMINED_REGION: i64 = 99;

/// Write a synthetic patient-count extract.
#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, default_value = "effectifs.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also write a few rows the dashboard must drop (bad years, an overlong line).
    #[arg(long)]
    with_noise: bool,
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    annee: String,
    patho_niv1: &'a str,
    libelle_classe_age: &'a str,
    libelle_sexe: &'a str,
    region: i64,
    #[serde(rename = "Ntop")]
    ntop: u64,
}

/// Deterministic noise source (splitmix64).
struct Noise(u64);

impl Noise {
    fn unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[1 - spread, 1 + spread)`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + spread * (2.0 * self.unit() - 1.0)
    }
}

/// Relative weight of an age bracket for a pathology: psychiatric counts peak
/// in mid-life, the others grow with age.
fn age_weight(pathology: &str, age_idx: usize) -> f64 {
    let x = age_idx as f64;
    if pathology == "Maladies psychiatriques" {
        (-(x - 10.0).powi(2) / 40.0).exp() + 0.15
    } else {
        (x / 19.0).powi(3) + 0.01
    }
}

/// Sum of `detail` over the strata matching the selected indices; `None`
/// selects the aggregate over that dimension.
fn aggregate(
    detail: &[[[u64; REGIONS.len()]; SEXES.len()]],
    age: Option<usize>,
    sex: Option<usize>,
    region: Option<usize>,
) -> u64 {
    let mut sum = 0;
    for (a, by_sex) in detail.iter().enumerate() {
        if age.is_some_and(|i| i != a) {
            continue;
        }
        for (s, by_region) in by_sex.iter().enumerate() {
            if sex.is_some_and(|i| i != s) {
                continue;
            }
            for (r, count) in by_region.iter().enumerate() {
                if region.is_some_and(|i| i != r) {
                    continue;
                }
                sum += count;
            }
        }
    }
    sum
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = Noise(cli.seed);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        // the noise rows include an overlong line
        .flexible(true)
        .from_path(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;

    let region_total: f64 = REGIONS.iter().map(|(_, w)| w).sum();
    let mut rows = 0usize;

    for year in 2015..=2022 {
        let trend = 1.0 + 0.025 * (year - 2015) as f64;
        for &(pathology, base) in &PATHOLOGIES {
            let mut detail = vec![[[0u64; REGIONS.len()]; SEXES.len()]; AGES.len()];
            for (a, by_sex) in detail.iter_mut().enumerate() {
                for (s, by_region) in by_sex.iter_mut().enumerate() {
                    let sex_weight = if s == 1 { 1.1 } else { 0.9 };
                    for (r, count) in by_region.iter_mut().enumerate() {
                        let region_weight = REGIONS[r].1 / region_total;
                        let value = base * 100.0
                            * trend
                            * age_weight(pathology, a)
                            * sex_weight
                            * region_weight
                            * rng.jitter(0.1);
                        *count = value.round().max(0.0) as u64;
                    }
                }
            }

            let ages = (0..AGES.len()).map(Some).chain([None]);
            for age in ages {
                let sexes = (0..SEXES.len()).map(Some).chain([None]);
                for sex in sexes {
                    let regions = (0..REGIONS.len()).map(Some).chain([None]);
                    for region in regions {
                        writer.serialize(Row {
                            annee: year.to_string(),
                            patho_niv1: pathology,
                            libelle_classe_age: age.map_or(ALL_AGES, |i| AGES[i]),
                            libelle_sexe: sex.map_or(ALL_SEXES, |i| SEXES[i]),
                            region: region.map_or(UNDETERMINED_REGION, |i| REGIONS[i].0),
                            ntop: aggregate(&detail, age, sex, region),
                        })?;
                        rows += 1;
                    }
                }
            }
        }
    }

    if cli.with_noise {
        for annee in ["2014", "2023", "NA"] {
            writer.serialize(Row {
                annee: annee.to_string(),
                patho_niv1: PATHOLOGIES[0].0,
                libelle_classe_age: ALL_AGES,
                libelle_sexe: ALL_SEXES,
                region: UNDETERMINED_REGION,
                ntop: 1_000_000,
            })?;
            rows += 1;
        }
        writer.write_record(["2020", PATHOLOGIES[0].0, ALL_AGES, ALL_SEXES, "99", "10", "stray"])?;
        rows += 1;
    }

    writer.flush()?;
    println!("Wrote {rows} rows to {}", cli.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_is_seeded_and_bounded() {
        let (mut a, mut b) = (Noise(42), Noise(42));
        for _ in 0..1000 {
            let x = a.jitter(0.1);
            assert_eq!(x, b.jitter(0.1));
            assert!((0.9..1.1).contains(&x));
        }
        assert_ne!(Noise(1).unit(), Noise(2).unit());
    }
}
