//! Daily weather-station dataset pipeline: load the BMKG JSON export, describe
//! each measured parameter, save the table as CSV and chart the monthly
//! temperature and rainfall.

use std::io;

use miette::Diagnostic;
use thiserror::Error;

pub mod analyze;
pub mod config;
pub mod load;
pub mod plot;
pub mod resample;
pub mod run;
pub mod table;

pub use config::Config;
pub use load::Metadata;
pub use run::{Artifacts, Outcome};
pub use table::{Cell, Table};

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(
        code(bmkg::load),
        help("the input must be a JSON object with a `data` array of daily records and a `meta` object")
    )]
    Load(#[from] load::LoadError),
    #[error(transparent)]
    #[diagnostic(
        code(bmkg::analyze),
        help("every parameter listed in `meta.parameters` must hold numbers")
    )]
    Analyze(#[from] analyze::AnalyzeError),
    #[error(transparent)]
    #[diagnostic(code(bmkg::plot))]
    Plot(#[from] plot::PlotError),
    #[error("Could not write the run log")]
    #[diagnostic(code(bmkg::io))]
    Io(#[from] io::Error),
}
