//! GLORYS products, their upstream identifiers and coverage windows.

use std::{fmt, path::PathBuf, str::FromStr};

use chrono::{Days, NaiveDate};

use crate::error::ValidationError;

/// Maximum depth served by every GLORYS product, in metres.
pub const MAX_DEPTH: f64 = 5728.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Selects which GLORYS product a run downloads from.
pub enum Product {
    Reanalysis,
    ForecastPhysics,
    ForecastBiogeochem,
}

impl Product {
    pub const ALL: [Product; 3] = [
        Product::Reanalysis,
        Product::ForecastPhysics,
        Product::ForecastBiogeochem,
    ];

    pub fn info(self) -> &'static ProductInfo {
        match self {
            Product::Reanalysis => &PRODUCTS[0],
            Product::ForecastPhysics => &PRODUCTS[1],
            Product::ForecastBiogeochem => &PRODUCTS[2],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Product {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "reanalysis" => Ok(Product::Reanalysis),
            "forecast-physics" => Ok(Product::ForecastPhysics),
            "forecast-biogeochem" => Ok(Product::ForecastBiogeochem),
            _ => Err(ValidationError::UnknownProduct(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Last date a product serves.
pub enum CoverageEnd {
    Fixed(NaiveDate),
    DaysAfterToday(u64),
}

#[derive(Debug)]
/// A dataset within a product and the variables it serves.
pub struct Dataset {
    pub id: &'static str,
    pub variables: &'static [&'static str],
    /// Subfolder keeping this dataset's files apart from its siblings'.
    pub folder: Option<&'static str>,
}

#[derive(Debug)]
/// Static description of one product.
pub struct ProductInfo {
    pub product: Product,
    pub name: &'static str,
    pub service_id: &'static str,
    pub motu_url: &'static str,
    pub datasets: &'static [Dataset],
    pub monthly_dataset: Option<&'static str>,
    pub coverage_start: NaiveDate,
    pub coverage_end: CoverageEnd,
    pub default_variables: &'static [&'static str],
    pub default_depth: (f64, f64),
}

impl ProductInfo {
    /// First and last servable dates, given today's date.
    pub fn coverage(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = match self.coverage_end {
            CoverageEnd::Fixed(end) => end,
            CoverageEnd::DaysAfterToday(days) => today
                .checked_add_days(Days::new(days))
                .unwrap_or(NaiveDate::MAX),
        };

        (self.coverage_start, end)
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &'static str> {
        self.datasets
            .iter()
            .flat_map(|dataset| dataset.variables.iter().copied())
    }

    pub fn serves(&self, variable: &str) -> bool {
        self.vocabulary().any(|v| v == variable)
    }

    /// Finds the single dataset serving every requested variable.
    pub fn resolve_dataset(&self, variables: &[String]) -> Result<&'static Dataset, ValidationError> {
        let first = variables.first().ok_or(ValidationError::NoVariables)?;

        for variable in variables {
            if !self.serves(variable) {
                return Err(ValidationError::UnknownVariable {
                    variable: variable.clone(),
                    product: self.product,
                });
            }
        }

        let dataset = self
            .dataset_for(first)
            .ok_or_else(|| ValidationError::UnknownVariable {
                variable: first.clone(),
                product: self.product,
            })?;

        if let Some(other) = variables
            .iter()
            .find(|v| !dataset.variables.contains(&v.as_str()))
        {
            return Err(ValidationError::MixedDatasets {
                first: first.clone(),
                second: other.clone(),
                product: self.product,
            });
        }

        Ok(dataset)
    }

    /// Default location of a run's files, relative to the download root.
    pub fn output_subdirectory(&self, variables: &[String]) -> Result<PathBuf, ValidationError> {
        let dataset = self.resolve_dataset(variables)?;
        let mut path = PathBuf::from(self.name);
        if let Some(folder) = dataset.folder {
            path.push(folder);
        }

        Ok(path)
    }

    fn dataset_for(&self, variable: &str) -> Option<&'static Dataset> {
        self.datasets
            .iter()
            .find(|dataset| dataset.variables.contains(&variable))
    }
}

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid coverage date"),
    }
}

const REANALYSIS_VARIABLES: &[&str] = &[
    "so", "thetao", "uo", "vo", "zos", "bottomT", "mlotst", "siconc", "sithick", "usi", "vsi",
];

const BIOGEOCHEM_VARIABLES: &[&str] = &[
    "dissic", "talk", "si", "po4", "ph", "spco2", "o2", "no3", "fe", "phyc", "chl", "nppv",
];

static PRODUCTS: [ProductInfo; 3] = [
    ProductInfo {
        product: Product::Reanalysis,
        name: "reanalysis",
        service_id: "GLOBAL_MULTIYEAR_PHY_001_030-TDS",
        motu_url: "https://my.cmems-du.eu/motu-web/Motu",
        datasets: &[Dataset {
            id: "cmems_mod_glo_phy_my_0.083_P1D-m",
            variables: REANALYSIS_VARIABLES,
            folder: None,
        }],
        monthly_dataset: None,
        coverage_start: ymd(1993, 1, 1),
        coverage_end: CoverageEnd::Fixed(ymd(2020, 12, 31)),
        default_variables: &["so", "thetao", "uo", "vo", "zos"],
        // Exact bounds of the dataset's vertical levels.
        default_depth: (0.49402499198913574, 5727.9169921875),
    },
    ProductInfo {
        product: Product::ForecastPhysics,
        name: "forecast-physics",
        service_id: "GLOBAL_ANALYSISFORECAST_PHY_001_024-TDS",
        motu_url: "https://nrt.cmems-du.eu/motu-web/Motu",
        datasets: &[
            Dataset {
                id: "cmems_mod_glo_phy-so_anfc_0.083deg_P1D-m",
                variables: &["so"],
                folder: Some("so"),
            },
            Dataset {
                id: "cmems_mod_glo_phy-thetao_anfc_0.083deg_P1D-m",
                variables: &["thetao"],
                folder: Some("thetao"),
            },
            Dataset {
                id: "cmems_mod_glo_phy-cur_anfc_0.083deg_P1D-m",
                variables: &["uo", "vo"],
                folder: Some("cur"),
            },
            Dataset {
                id: "cmems_mod_glo_phy_anfc_0.083deg_P1D-m",
                variables: &["zos"],
                folder: Some("zos"),
            },
        ],
        monthly_dataset: None,
        coverage_start: ymd(2020, 11, 1),
        coverage_end: CoverageEnd::DaysAfterToday(2),
        default_variables: &["thetao"],
        default_depth: (0.0, MAX_DEPTH),
    },
    ProductInfo {
        product: Product::ForecastBiogeochem,
        name: "forecast-biogeochem",
        service_id: "GLOBAL_ANALYSIS_FORECAST_BIO_001_028-TDS",
        motu_url: "https://nrt.cmems-du.eu/motu-web/Motu",
        datasets: &[Dataset {
            id: "global-analysis-forecast-bio-001-028-daily",
            variables: BIOGEOCHEM_VARIABLES,
            folder: None,
        }],
        monthly_dataset: Some("global-analysis-forecast-bio-001-028-monthly"),
        coverage_start: ymd(2020, 11, 1),
        coverage_end: CoverageEnd::DaysAfterToday(0),
        default_variables: BIOGEOCHEM_VARIABLES,
        default_depth: (0.0, MAX_DEPTH),
    },
];

// -- Tests -------------------------------------------------------------------
