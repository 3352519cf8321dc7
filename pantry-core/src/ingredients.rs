//! Ingredient parsing.
//!
//! Splits raw ingredient strings (e.g., "1 1/2 cups flour, sifted") into a
//! quantity, a unit id from a [`UnitTable`], and the remaining description.
//! The parser sits behind the [`IngredientParser`] trait so hosts with a
//! better tokenizer can plug their own in.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::types::MeasurementSystem;

/// A unit known to the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier, e.g. "tablespoon".
    pub id: String,
    /// System the unit belongs to; `None` for count units like "clove".
    pub system: Option<MeasurementSystem>,
    /// Lowercase spellings matched at the start of the text after the quantity.
    pub aliases: Vec<String>,
}

/// Lookup table from unit spellings to unit ids.
#[derive(Debug, Clone)]
pub struct UnitTable {
    units: Vec<Unit>,
    /// (alias, index into `units`), longest alias first so "tablespoons"
    /// wins over "tb".
    aliases: Vec<(String, usize)>,
}

const METRIC: Option<MeasurementSystem> = Some(MeasurementSystem::Metric);
const US: Option<MeasurementSystem> = Some(MeasurementSystem::Us);

const STANDARD_UNITS: &[(&str, Option<MeasurementSystem>, &[&str])] = &[
    // Volume - US
    ("fluid_ounce", US, &["fluid ounces", "fluid ounce", "fl. oz", "fl oz", "floz"]),
    ("tablespoon", US, &["tablespoons", "tablespoon", "tbsp", "tbs", "tb", "t"]),
    ("teaspoon", US, &["teaspoons", "teaspoon", "tsp", "ts"]),
    ("gallon", US, &["gallons", "gallon", "gal"]),
    ("quart", US, &["quarts", "quart", "qt"]),
    ("pint", US, &["pints", "pint", "pt"]),
    ("cup", US, &["cups", "cup", "c"]),
    // Weight - US
    ("ounce", US, &["ounces", "ounce", "oz"]),
    ("pound", US, &["pounds", "pound", "lbs", "lb"]),
    // Volume - Metric
    ("milliliter", METRIC, &["milliliters", "milliliter", "millilitres", "millilitre", "ml"]),
    ("centiliter", METRIC, &["centiliters", "centiliter", "centilitres", "centilitre", "cl"]),
    ("deciliter", METRIC, &["deciliters", "deciliter", "decilitres", "decilitre", "dl"]),
    ("liter", METRIC, &["liters", "liter", "litres", "litre", "l"]),
    // Weight - Metric
    ("kilogram", METRIC, &["kilograms", "kilogram", "kilos", "kilo", "kg"]),
    ("milligram", METRIC, &["milligrams", "milligram", "mg"]),
    ("gram", METRIC, &["grams", "gram", "gr", "g"]),
    // Count/Size
    ("package", None, &["packages", "package", "pkgs", "pkg"]),
    ("handful", None, &["handfuls", "handful"]),
    ("bottle", None, &["bottles", "bottle"]),
    ("bunch", None, &["bunches", "bunch"]),
    ("pinch", None, &["pinches", "pinch"]),
    ("slice", None, &["slices", "slice"]),
    ("sprig", None, &["sprigs", "sprig"]),
    ("stalk", None, &["stalks", "stalk"]),
    ("piece", None, &["pieces", "piece", "pcs", "pc"]),
    ("clove", None, &["cloves", "clove"]),
    ("dash", None, &["dashes", "dash"]),
    ("drop", None, &["drops", "drop"]),
    ("head", None, &["heads", "head"]),
    ("stick", None, &["sticks", "stick"]),
    ("cube", None, &["cubes", "cube"]),
    ("can", None, &["cans", "can"]),
    ("jar", None, &["jars", "jar"]),
    ("bag", None, &["bags", "bag"]),
    ("box", None, &["boxes", "box"]),
];

static STANDARD_TABLE: LazyLock<UnitTable> = LazyLock::new(|| {
    UnitTable::new(
        STANDARD_UNITS
            .iter()
            .map(|(id, system, aliases)| Unit {
                id: (*id).to_string(),
                system: *system,
                aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            })
            .collect(),
    )
});

impl UnitTable {
    pub fn new(units: Vec<Unit>) -> Self {
        let mut aliases: Vec<(String, usize)> = units
            .iter()
            .enumerate()
            .flat_map(|(idx, unit)| {
                unit.aliases
                    .iter()
                    .map(move |alias| (alias.to_lowercase(), idx))
            })
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { units, aliases }
    }

    /// The built-in table of common cooking units.
    pub fn standard() -> &'static UnitTable {
        &STANDARD_TABLE
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Match a unit at the start of `s` on a word boundary.
    /// Returns the unit and the number of bytes consumed (including a trailing period).
    pub fn match_prefix(&self, s: &str) -> Option<(&Unit, usize)> {
        for (alias, idx) in &self.aliases {
            let Some(prefix) = s.get(..alias.len()) else {
                continue;
            };
            if !prefix.eq_ignore_ascii_case(alias) {
                continue;
            }
            let after = &s[alias.len()..];
            if after.is_empty()
                || after.starts_with(|c: char| {
                    c.is_whitespace() || matches!(c, '.' | ',' | ')' | ';' | '/')
                })
            {
                let consumed = alias.len() + usize::from(after.starts_with('.'));
                return Some((&self.units[*idx], consumed));
            }
        }
        None
    }

    /// Guess which measurement system a list of ingredient lines is written in.
    ///
    /// Each line contributes the system of the first unit that directly follows a
    /// number. Returns `None` when no line carries a system-specific unit or the
    /// counts tie.
    pub fn detect_system(&self, lines: &[String]) -> Option<MeasurementSystem> {
        let mut metric = 0usize;
        let mut us = 0usize;

        for line in lines {
            match self.first_measured_system(line) {
                Some(MeasurementSystem::Metric) => metric += 1,
                Some(MeasurementSystem::Us) => us += 1,
                None => {}
            }
        }

        match metric.cmp(&us) {
            std::cmp::Ordering::Greater => Some(MeasurementSystem::Metric),
            std::cmp::Ordering::Less => Some(MeasurementSystem::Us),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn first_measured_system(&self, line: &str) -> Option<MeasurementSystem> {
        let mut rest = line;
        while let Some(pos) = rest.find(|c: char| c.is_ascii_digit() || is_vulgar_fraction(c)) {
            let after_number = rest[pos..]
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || is_vulgar_fraction(c) || matches!(c, '.' | ',' | '/')
                })
                .trim_start();
            if let Some((unit, _)) = self.match_prefix(after_number) {
                if unit.system.is_some() {
                    return unit.system;
                }
            }
            rest = after_number;
            if rest.is_empty() {
                break;
            }
        }
        None
    }
}

/// Parsed ingredient structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    pub quantity: Option<f64>,
    pub unit_id: Option<String>,
    pub description: String,
}

/// Tokenizes ingredient lines into quantity, unit and description.
pub trait IngredientParser: Send + Sync {
    /// Parse each line; the output has the same length and order as `lines`.
    fn parse(&self, lines: &[String], units: &UnitTable) -> Vec<ParsedIngredient>;
}

/// Best-effort parser for common English ingredient lines.
///
/// If nothing meaningful can be extracted the whole line becomes the description.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedParser;

impl IngredientParser for RuleBasedParser {
    fn parse(&self, lines: &[String], units: &UnitTable) -> Vec<ParsedIngredient> {
        lines
            .iter()
            .map(|line| parse_ingredient(line, units))
            .collect()
    }
}

/// Parse a single ingredient line.
pub fn parse_ingredient(raw: &str, units: &UnitTable) -> ParsedIngredient {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedIngredient {
            quantity: None,
            unit_id: None,
            description: String::new(),
        };
    }

    // Step 1: quantity at the start ("1 1/2", "½", "2.5", "2-3")
    let (quantity, remaining) = extract_quantity(raw);

    // Step 2: unit directly after the quantity
    let (unit_id, remaining) = match units.match_prefix(remaining) {
        Some((unit, consumed)) if quantity.is_some() || unit.system.is_some() => {
            (Some(unit.id.clone()), remaining[consumed..].trim_start())
        }
        _ => (None, remaining),
    };

    // Step 3: drop parenthetical alternative measurements, e.g. "(113g)"
    let description = strip_parenthetical_measurements(remaining, units);
    let description = description
        .trim_start_matches("of ")
        .trim()
        .to_string();

    ParsedIngredient {
        quantity,
        unit_id,
        description: if description.is_empty() {
            raw.to_string()
        } else {
            description
        },
    }
}

fn is_vulgar_fraction(c: char) -> bool {
    vulgar_fraction_value(c).is_some()
}

fn vulgar_fraction_value(c: char) -> Option<f64> {
    let value = match c {
        '¼' => 0.25,
        '½' => 0.5,
        '¾' => 0.75,
        '⅓' => 1.0 / 3.0,
        '⅔' => 2.0 / 3.0,
        '⅛' => 0.125,
        '⅜' => 0.375,
        '⅝' => 0.625,
        '⅞' => 0.875,
        '⅕' => 0.2,
        '⅖' => 0.4,
        '⅗' => 0.6,
        '⅘' => 0.8,
        '⅙' => 1.0 / 6.0,
        '⅚' => 5.0 / 6.0,
        _ => return None,
    };
    Some(value)
}

/// Extract a quantity from the beginning of a string.
/// Returns (quantity, remaining_string). Ranges keep their lower bound.
fn extract_quantity(s: &str) -> (Option<f64>, &str) {
    let (first, rest) = match read_number(s) {
        Some(found) => found,
        None => return (None, s),
    };

    // Mixed number: "1 1/2" or "1 ½"
    let mut quantity = first;
    let mut remaining = rest;
    if first.fract() == 0.0 {
        if let Some((fraction, after)) = read_number(remaining) {
            if fraction < 1.0 && fraction > 0.0 {
                quantity += fraction;
                remaining = after;
            }
        }
    }

    // Range: "2-3", "2 – 3", "2 to 3"
    let trimmed = remaining.trim_start();
    let range_rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('–'))
        .or_else(|| trimmed.strip_prefix("to "));
    if let Some(range_rest) = range_rest {
        if let Some((_, after)) = read_number(range_rest) {
            remaining = after;
        }
    }

    (Some(quantity), remaining.trim_start())
}

/// Read one number token: "2", "2.5", "2,5", "1/2", "½", "1½".
fn read_number(s: &str) -> Option<(f64, &str)> {
    let s = s.trim_start();
    let mut chars = s.char_indices().peekable();

    // Leading unicode fraction on its own
    if let Some(&(_, c)) = chars.peek() {
        if let Some(value) = vulgar_fraction_value(c) {
            return Some((value, &s[c.len_utf8()..]));
        }
    }

    let digits_end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }
    let whole = &s[..digits_end];
    let after = &s[digits_end..];

    // Fraction "1/2"
    if let Some(denominator_part) = after.strip_prefix('/') {
        let den_end = denominator_part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(denominator_part.len());
        if den_end > 0 {
            let numerator: f64 = whole.parse().ok()?;
            let denominator: f64 = denominator_part[..den_end].parse().ok()?;
            if denominator > 0.0 {
                return Some((numerator / denominator, &denominator_part[den_end..]));
            }
        }
        return None;
    }

    // Decimal "2.5" or "2,5"
    if let Some(decimal_part) = after.strip_prefix(['.', ',']) {
        let dec_end = decimal_part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(decimal_part.len());
        let is_decimal = dec_end > 0 && (after.starts_with('.') || dec_end <= 2);
        if is_decimal {
            let number = format!("{}.{}", whole, &decimal_part[..dec_end]);
            let value: f64 = number.parse().ok()?;
            return Some((value, &decimal_part[dec_end..]));
        }
    }

    let value: f64 = whole.parse().ok()?;

    // Attached unicode fraction "1½"
    if let Some(c) = after.chars().next() {
        if let Some(fraction) = vulgar_fraction_value(c) {
            return Some((value + fraction, &after[c.len_utf8()..]));
        }
    }

    Some((value, after))
}

/// Remove "(...)" groups whose content parses as a measurement.
fn strip_parenthetical_measurements(s: &str, units: &UnitTable) -> String {
    let mut result = s.to_string();
    let mut search_from = 0;

    while let Some(start) = result[search_from..].find('(').map(|p| p + search_from) {
        let Some(end) = result[start..].find(')').map(|p| p + start) else {
            break;
        };
        let inner = &result[start + 1..end];
        let (quantity, rest) = extract_quantity(inner);
        let is_measurement = quantity.is_some() && units.match_prefix(rest).is_some();

        if is_measurement {
            let before = result[..start].trim_end();
            let after = result[end + 1..].trim_start();
            result = if before.is_empty() {
                after.to_string()
            } else if after.is_empty() {
                before.to_string()
            } else {
                format!("{} {}", before, after)
            };
            search_from = 0;
        } else {
            search_from = end + 1;
        }
    }

    result
}
