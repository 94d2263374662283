mod alignment;
mod effort;
mod metadata;
mod outcomes;
mod report;
mod run;
mod security;

pub use run::run;

use alignment::*;
use effort::*;
use metadata::*;
use outcomes::*;
use report::*;
use security::*;
