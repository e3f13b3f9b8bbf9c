use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::cli::CalculateArgs;
use crate::model::{DerivedPercentages, LoafRecord, RecordError, numeric, total_flour, value_kind};
use crate::util::{load_record, round_to, write_record};

const RESERVED_INGREDIENTS: [&str; 3] = ["water", "levain", "salt"];

pub fn run(args: CalculateArgs) -> Result<()> {
    let mut record = load_record(&args.path)?;

    let derived = calculate(&mut record)
        .with_context(|| format!("failed to calculate percentages for {}", args.path.display()))?;

    if args.dry_run {
        info!(path = %args.path.display(), "calculate dry-run, record not written");
    } else {
        write_record(&args.path, &record)?;
        info!(path = %args.path.display(), "wrote derived percentages");
    }

    write_text_summary(&args.path, &derived)
}

/// Derives baker's percentages from `ingredients` and stores them as
/// `hydration_pct`, `inoculation_pct` and `salt_pct` on the record.
///
/// The record is only touched on success. A record without positive flour
/// weight yields [`RecordError::NoFlour`].
pub fn calculate(record: &mut LoafRecord) -> Result<DerivedPercentages, RecordError> {
    let derived = {
        let Some(ingredients) = record.section("ingredients")? else {
            warn!("no ingredients section, nothing to calculate");
            return Err(RecordError::NoFlour);
        };

        let flour = total_flour(ingredients);
        if flour == 0.0 {
            warn!("no flour specified in ingredients");
            return Err(RecordError::NoFlour);
        }

        let mut weights = [0.0; 3];
        for (slot, name) in weights.iter_mut().zip(RESERVED_INGREDIENTS) {
            *slot = ingredient_weight(ingredients, name)?;
        }
        let [water, levain, salt] = weights;

        DerivedPercentages {
            hydration_pct: round_to(water / flour * 100.0, 1),
            inoculation_pct: round_to(levain / flour * 100.0, 1),
            salt_pct: round_to(salt / flour * 100.0, 2),
        }
    };

    let fields = record.fields_mut();
    fields.insert("hydration_pct".into(), derived.hydration_pct.into());
    fields.insert("inoculation_pct".into(), derived.inoculation_pct.into());
    fields.insert("salt_pct".into(), derived.salt_pct.into());

    Ok(derived)
}

fn ingredient_weight(ingredients: &Mapping, name: &'static str) -> Result<f64, RecordError> {
    match ingredients.get(name) {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => numeric(value).ok_or(RecordError::NonNumericIngredient {
            name,
            found: value_kind(value),
        }),
    }
}

fn write_text_summary(path: &Path, derived: &DerivedPercentages) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "✓ Calculated percentages for {}", path.display())?;
    writeln!(output, "  Hydration: {:?}%", derived.hydration_pct)?;
    writeln!(output, "  Inoculation: {:?}%", derived.inoculation_pct)?;
    writeln!(output, "  Salt: {:?}%", derived.salt_pct)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{calculate, run};
    use crate::cli::CalculateArgs;
    use crate::model::{LoafRecord, RecordError};
    use crate::util::load_record;
    use std::fs;

    fn record(yaml: &str) -> LoafRecord {
        LoafRecord::from_value(serde_yaml::from_str(yaml).expect("fixture should parse"))
            .expect("fixture should be a mapping")
    }

    fn pct(record: &LoafRecord, key: &str) -> f64 {
        record
            .get(key)
            .and_then(|value| value.as_f64())
            .unwrap_or_else(|| panic!("{key} should be set"))
    }

    #[test]
    fn calculates_percentages_against_combined_flours() {
        let mut loaf = record(
            "ingredients:\n  flour_dark: 400\n  flour_rye: 100\n  water: 350\n  salt: 10\n  levain: 100\n",
        );

        let derived = calculate(&mut loaf).expect("flour is present");

        assert_eq!(derived.hydration_pct, 70.0);
        assert_eq!(derived.inoculation_pct, 20.0);
        assert_eq!(derived.salt_pct, 2.0);
        assert_eq!(pct(&loaf, "hydration_pct"), 70.0);
        assert_eq!(pct(&loaf, "inoculation_pct"), 20.0);
        assert_eq!(pct(&loaf, "salt_pct"), 2.0);
    }

    #[test]
    fn rounds_hydration_and_inoculation_to_one_place_and_salt_to_two() {
        let mut loaf =
            record("ingredients:\n  flour_bread: 333\n  water: 234\n  levain: 66\n  salt: 7\n");

        let derived = calculate(&mut loaf).expect("flour is present");

        assert_eq!(derived.hydration_pct, 70.3);
        assert_eq!(derived.inoculation_pct, 19.8);
        assert_eq!(derived.salt_pct, 2.1);
    }

    #[test]
    fn missing_water_levain_and_salt_count_as_zero() {
        let mut loaf = record("ingredients:\n  flour_white: 500\n");

        let derived = calculate(&mut loaf).expect("flour is present");

        assert_eq!(derived.hydration_pct, 0.0);
        assert_eq!(derived.inoculation_pct, 0.0);
        assert_eq!(derived.salt_pct, 0.0);
    }

    #[test]
    fn null_water_counts_as_zero() {
        let mut loaf = record("ingredients:\n  flour_white: 500\n  water:\n  levain: 100\n");

        let derived = calculate(&mut loaf).expect("flour is present");

        assert_eq!(derived.hydration_pct, 0.0);
        assert_eq!(derived.inoculation_pct, 20.0);
        assert_eq!(pct(&loaf, "hydration_pct"), 0.0);
    }

    #[test]
    fn inoculation_above_one_hundred_percent_is_kept() {
        let mut loaf = record("ingredients:\n  flour_white: 100\n  levain: 150\n");

        let derived = calculate(&mut loaf).expect("flour is present");

        assert_eq!(derived.inoculation_pct, 150.0);
    }

    #[test]
    fn no_flour_fails_without_touching_the_record() {
        for yaml in [
            "ingredients:\n  water: 350\n  salt: 10\n",
            "ingredients:\n  flour_dark: 0\n  flour_rye: 0\n  water: 350\n",
            "ingredients: {}\n",
            "loaf_number: 3\n",
        ] {
            let mut loaf = record(yaml);
            let before = loaf.clone();

            assert_eq!(calculate(&mut loaf), Err(RecordError::NoFlour), "{yaml}");
            assert_eq!(loaf, before);
            assert!(loaf.get("hydration_pct").is_none());
        }
    }

    #[test]
    fn unprefixed_keys_never_count_as_flour() {
        let mut loaf =
            record("ingredients:\n  sourdough_starter: 500\n  whole_wheat: 300\n  water: 350\n");
        assert_eq!(calculate(&mut loaf), Err(RecordError::NoFlour));

        let mut loaf =
            record("ingredients:\n  flour_white: 500\n  sourdough_starter: 500\n  water: 250\n");
        let derived = calculate(&mut loaf).expect("flour is present");
        assert_eq!(derived.hydration_pct, 50.0);
    }

    #[test]
    fn overwrites_stale_derived_fields_and_leaves_the_rest_alone() {
        let mut loaf = record(
            "loaf_number: 6\nhydration_pct: 99.9\ningredients:\n  flour_white: 500\n  water: 375\nnotes: open crumb\n",
        );

        calculate(&mut loaf).expect("flour is present");

        assert_eq!(pct(&loaf, "hydration_pct"), 75.0);
        assert_eq!(loaf.get("notes").and_then(|v| v.as_str()), Some("open crumb"));
        assert_eq!(loaf.get("loaf_number").and_then(|v| v.as_u64()), Some(6));
        let keys: Vec<&str> = loaf.fields().keys().filter_map(|key| key.as_str()).collect();
        assert_eq!(
            keys,
            ["loaf_number", "hydration_pct", "ingredients", "notes", "inoculation_pct", "salt_pct"]
        );
    }

    #[test]
    fn scalar_ingredients_is_a_shape_error_not_missing_flour() {
        let mut loaf = record("ingredients: 500\n");

        let err = calculate(&mut loaf).expect_err("ingredients is not a mapping");

        assert_eq!(
            err,
            RecordError::SectionNotMapping {
                section: "ingredients",
                found: "a number",
            }
        );
    }

    #[test]
    fn non_numeric_water_is_rejected() {
        let mut loaf = record("ingredients:\n  flour_white: 500\n  water: lots\n");
        let before = loaf.clone();

        let err = calculate(&mut loaf).expect_err("water is text");

        assert_eq!(
            err,
            RecordError::NonNumericIngredient {
                name: "water",
                found: "a string",
            }
        );
        assert_eq!(loaf, before);
    }

    #[test]
    fn run_writes_percentages_back_to_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("loaf-006.yaml");
        fs::write(
            &path,
            "loaf_number: 6\ndate: 2026-02-04\ningredients:\n  flour_dark: 333\n  water: 234\n  levain: 66\n  salt: 7\n",
        )
        .expect("write fixture");

        run(CalculateArgs {
            path: path.clone(),
            dry_run: false,
        })
        .expect("calculate should succeed");

        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.contains("hydration_pct: 70.3"));
        assert!(written.contains("inoculation_pct: 19.8"));
        assert!(written.contains("salt_pct: 2.1"));
        let reloaded = load_record(&path).expect("written file reloads");
        assert_eq!(pct(&reloaded, "salt_pct"), 2.1);
    }

    #[test]
    fn run_dry_run_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("loaf-008.yaml");
        let original = "loaf_number: 8\ningredients:\n  flour_white: 500\n  water: 350\n";
        fs::write(&path, original).expect("write fixture");

        run(CalculateArgs {
            path: path.clone(),
            dry_run: true,
        })
        .expect("calculate should succeed");

        assert_eq!(fs::read_to_string(&path).expect("read back"), original);
    }

    #[test]
    fn run_fails_when_no_flour_is_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("loaf-009.yaml");
        let original = "loaf_number: 9\ningredients:\n  water: 350\n";
        fs::write(&path, original).expect("write fixture");

        let err = run(CalculateArgs {
            path: path.clone(),
            dry_run: false,
        })
        .expect_err("no flour");

        assert!(format!("{err:#}").contains("No flour specified in ingredients"));
        assert_eq!(fs::read_to_string(&path).expect("read back"), original);
    }
}
