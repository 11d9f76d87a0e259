use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SckanError;

/// Column names shared by the connectivity queries and the table API.
pub mod columns {
    pub const NEURON_IRI: &str = "Neuron_IRI";
    pub const NEURON_ID: &str = "Neuron_ID";
    pub const NEURON_LABEL: &str = "Neuron_Label";
    pub const SPECIES: &str = "Species";
    pub const SPECIES_LINK: &str = "Species_link";
    pub const A: &str = "A";
    pub const B: &str = "B";
    pub const C: &str = "C";
    pub const REGION_A: &str = "Region_A";
    pub const REGION_B: &str = "Region_B";
    pub const REGION_C: &str = "Region_C";
}

/// Raw endpoint result: row 0 is the header, rows may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn records(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a header column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header()?.iter().position(|column| column == name)
    }

    /// `(first, second)` field pairs of every record, in result order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records().iter().filter_map(|row| match row.as_slice() {
            [first, second, ..] => Some((first.as_str(), second.as_str())),
            _ => None,
        })
    }
}

/// Species that ship a region/coordinate reference asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    #[serde(rename = "Homo sapiens")]
    Human,
    #[serde(rename = "Mus musculus")]
    Mouse,
    #[serde(rename = "Rattus norvegicus")]
    Rat,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Human, Species::Mouse, Species::Rat];

    pub fn label(&self) -> &'static str {
        match self {
            Species::Human => "Homo sapiens",
            Species::Mouse => "Mus musculus",
            Species::Rat => "Rattus norvegicus",
        }
    }

    pub fn asset_file(&self) -> &'static str {
        match self {
            Species::Human => "coords_human.json",
            Species::Mouse => "coords_mouse.json",
            Species::Rat => "coords_rat.json",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Species {
    type Err = SckanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|species| species.label() == value.trim())
            .ok_or_else(|| SckanError::UnsupportedSpecies(value.to_string()))
    }
}

/// Position of a region along a neuron population path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionSlot {
    /// Soma location.
    A,
    /// Axon terminal or sensory location.
    B,
    /// Intermediate axon location.
    C,
}

impl RegionSlot {
    pub const ALL: [RegionSlot; 3] = [RegionSlot::A, RegionSlot::B, RegionSlot::C];

    pub fn uri_column(&self) -> &'static str {
        match self {
            RegionSlot::A => columns::A,
            RegionSlot::B => columns::B,
            RegionSlot::C => columns::C,
        }
    }

    pub fn label_column(&self) -> &'static str {
        match self {
            RegionSlot::A => columns::REGION_A,
            RegionSlot::B => columns::REGION_B,
            RegionSlot::C => columns::REGION_C,
        }
    }
}
