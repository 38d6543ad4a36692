//! Unit table for the measurement families that show up on HVAC equipment spec sheets.
//!
//! Every unit carries a scale and offset relative to a base unit of its dimension, so
//! conversion is `to.from_base(from.to_base(v))`. Only units of the same dimension convert.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Longest unit spelling we try to match, in words ("inches of water column").
const MAX_UNIT_WORDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Mass,
    Power,
    Pressure,
    VolumeFlow,
    Voltage,
    Current,
    Frequency,
    Temperature,
    RotationalSpeed,
    SoundLevel,
}

#[derive(Debug, PartialEq)]
pub struct Unit {
    pub name: &'static str,
    pub dimension: Dimension,
    scale: f64,
    offset: f64,
}

impl Unit {
    const fn linear(name: &'static str, dimension: Dimension, scale: f64) -> Self {
        Unit {
            name,
            dimension,
            scale,
            offset: 0.0,
        }
    }

    const fn affine(name: &'static str, dimension: Dimension, scale: f64, offset: f64) -> Self {
        Unit {
            name,
            dimension,
            scale,
            offset,
        }
    }

    fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

struct UnitDef {
    unit: Unit,
    spellings: &'static [&'static str],
}

use Dimension::*;

// Spellings are listed in folded form (see `fold_unit_text`): lowercase, no dots, no degree sign.
static UNITS: &[UnitDef] = &[
    // Length, base metre
    UnitDef {
        unit: Unit::linear("inch", Length, 0.0254),
        spellings: &["in", "inch", "inches", "\"", "″"],
    },
    UnitDef {
        unit: Unit::linear("foot", Length, 0.3048),
        spellings: &["ft", "foot", "feet", "'", "′"],
    },
    UnitDef {
        unit: Unit::linear("millimeter", Length, 0.001),
        spellings: &["mm", "millimeter", "millimeters", "millimetre", "millimetres"],
    },
    UnitDef {
        unit: Unit::linear("centimeter", Length, 0.01),
        spellings: &["cm", "centimeter", "centimeters", "centimetre", "centimetres"],
    },
    UnitDef {
        unit: Unit::linear("meter", Length, 1.0),
        spellings: &["m", "meter", "meters", "metre", "metres"],
    },
    // Mass, base kilogram
    UnitDef {
        unit: Unit::linear("pound", Mass, 0.453_592_37),
        spellings: &["lb", "lbs", "pound", "pounds"],
    },
    UnitDef {
        unit: Unit::linear("kilogram", Mass, 1.0),
        spellings: &["kg", "kgs", "kilogram", "kilograms"],
    },
    UnitDef {
        unit: Unit::linear("gram", Mass, 0.001),
        spellings: &["g", "gram", "grams"],
    },
    // Power, base watt. Refrigeration tons and Btu/h live here because cooling capacity is a rate.
    UnitDef {
        unit: Unit::linear("watt", Power, 1.0),
        spellings: &["w", "watt", "watts"],
    },
    UnitDef {
        unit: Unit::linear("kilowatt", Power, 1000.0),
        spellings: &["kw", "kilowatt", "kilowatts"],
    },
    UnitDef {
        unit: Unit::linear("btu_per_hour", Power, 0.293_071_07),
        spellings: &[
            "btu/h",
            "btu/hr",
            "btuh",
            "btu",
            "btu/hour",
            "btu per hour",
            "btu_per_hour",
        ],
    },
    UnitDef {
        unit: Unit::linear("mbh", Power, 293.071_07),
        spellings: &["mbh", "mbtuh", "mbtu/h", "mbtu/hr"],
    },
    UnitDef {
        unit: Unit::linear("ton_of_refrigeration", Power, 3_516.852_8),
        spellings: &[
            "ton",
            "tons",
            "tr",
            "rt",
            "ton_of_refrigeration",
            "refrigeration ton",
            "refrigeration tons",
            "tons of refrigeration",
        ],
    },
    UnitDef {
        unit: Unit::linear("horsepower", Power, 745.699_872),
        spellings: &["hp", "bhp", "horsepower"],
    },
    // Pressure, base pascal
    UnitDef {
        unit: Unit::linear("inch_H2O", Pressure, 249.088_91),
        spellings: &[
            "inch_h2o",
            "inch_h2o_39f",
            "in_h2o",
            "in h2o",
            "inh2o",
            "in wc",
            "in w c",
            "inwc",
            "iwc",
            "in wg",
            "in w g",
            "inwg",
            "iwg",
            "\" wc",
            "\" w c",
            "\"wc",
            "\" wg",
            "\" w g",
            "\"wg",
            "inches wc",
            "inches wg",
            "inches h2o",
            "in of water",
            "inches of water",
            "in water column",
            "inches of water column",
        ],
    },
    UnitDef {
        unit: Unit::linear("pascal", Pressure, 1.0),
        spellings: &["pa", "pascal", "pascals"],
    },
    UnitDef {
        unit: Unit::linear("kilopascal", Pressure, 1000.0),
        spellings: &["kpa", "kilopascal", "kilopascals"],
    },
    UnitDef {
        unit: Unit::linear("psi", Pressure, 6_894.757_293),
        spellings: &["psi", "psig", "psia"],
    },
    UnitDef {
        unit: Unit::linear("bar", Pressure, 100_000.0),
        spellings: &["bar", "barg"],
    },
    // Volumetric flow, base m3/s
    UnitDef {
        unit: Unit::linear("cfm", VolumeFlow, 0.000_471_947_443),
        spellings: &["cfm", "scfm", "ft3/min", "cubic_foot/minute", "cubic feet per minute"],
    },
    UnitDef {
        unit: Unit::linear("gpm", VolumeFlow, 0.000_063_090_196_4),
        spellings: &["gpm", "usgpm", "gal/min", "gallon/minute", "gallons per minute"],
    },
    UnitDef {
        unit: Unit::linear("liter_per_second", VolumeFlow, 0.001),
        spellings: &["l/s", "lps", "liter/second", "litre/second"],
    },
    UnitDef {
        unit: Unit::linear("cubic_meter_per_hour", VolumeFlow, 1.0 / 3600.0),
        spellings: &["m3/h", "m3/hr", "cmh"],
    },
    // Electrical
    UnitDef {
        unit: Unit::linear("volt", Voltage, 1.0),
        spellings: &["v", "volt", "volts", "vac", "vdc"],
    },
    UnitDef {
        unit: Unit::linear("kilovolt", Voltage, 1000.0),
        spellings: &["kv", "kilovolt", "kilovolts"],
    },
    UnitDef {
        unit: Unit::linear("ampere", Current, 1.0),
        spellings: &["a", "amp", "amps", "ampere", "amperes", "fla", "mca", "mop"],
    },
    UnitDef {
        unit: Unit::linear("milliampere", Current, 0.001),
        spellings: &["ma", "milliamp", "milliamps"],
    },
    UnitDef {
        unit: Unit::linear("hertz", Frequency, 1.0),
        spellings: &["hz", "hertz"],
    },
    // Temperature, base kelvin
    UnitDef {
        unit: Unit::affine("degF", Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
        spellings: &["f", "degf", "deg f", "degrees f", "fahrenheit"],
    },
    UnitDef {
        unit: Unit::affine("degC", Temperature, 1.0, 273.15),
        spellings: &["c", "degc", "deg c", "degrees c", "celsius"],
    },
    UnitDef {
        unit: Unit::linear("kelvin", Temperature, 1.0),
        spellings: &["k", "kelvin"],
    },
    UnitDef {
        unit: Unit::linear("rpm", RotationalSpeed, 1.0),
        spellings: &["rpm", "r/min"],
    },
    UnitDef {
        unit: Unit::linear("decibel", SoundLevel, 1.0),
        spellings: &["db", "dba", "db(a)", "decibel", "decibels"],
    },
];

lazy_static! {
    static ref SPELLINGS: HashMap<String, &'static Unit> = {
        let mut map = HashMap::new();
        for def in UNITS {
            map.insert(fold_unit_text(def.unit.name), &def.unit);
            for spelling in def.spellings {
                map.entry(fold_unit_text(spelling)).or_insert(&def.unit);
            }
        }
        map
    };
}

/// Fold a unit spelling into the form used as a lookup key.
pub fn fold_unit_text(text: &str) -> String {
    text.nfkc()
        .collect::<String>()
        .to_lowercase()
        .replace(['°', 'º', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';', ')', ':'])
        .trim()
        .to_string()
}

/// Look up a whole unit spelling ("inch_H2O", "in. w.c.", "°F").
pub fn lookup(text: &str) -> Option<&'static Unit> {
    SPELLINGS.get(&fold_unit_text(text)).copied()
}

/// Match the longest run of leading words in `text` that spells a known unit.
///
/// `"in. w.c. max"` resolves to inch of water; `"tons nominal"` to refrigeration tons.
pub fn match_leading(text: &str) -> Option<&'static Unit> {
    let folded = fold_unit_text(text);
    let words: Vec<&str> = folded.split(' ').filter(|w| !w.is_empty()).collect();
    let longest = words.len().min(MAX_UNIT_WORDS);

    (1..=longest).rev().find_map(|n| {
        let candidate = words[..n].join(" ");
        SPELLINGS
            .get(&candidate)
            .or_else(|| SPELLINGS.get(fold_unit_text(&candidate).as_str()))
            .copied()
    })
}

/// Convert `value` between two units, or `None` if their dimensions differ.
pub fn convert(value: f64, from: &Unit, to: &Unit) -> Option<f64> {
    if from.name == to.name {
        return Some(value);
    }
    if from.dimension != to.dimension {
        return None;
    }
    Some(to.from_base(from.to_base(value)))
}
