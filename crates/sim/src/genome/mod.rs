//! Genome structures for hosts and pathogens.

mod antigen;
mod chromosome;
mod diploid;
mod gene;
mod host;
mod pathogen;

pub use antigen::Antigen;
pub use chromosome::Chromosome;
pub use diploid::{Genome, Homolog, CHROMOSOME_SEPARATOR};
pub use gene::{Gene, Tag, TagSource};
pub use host::{Host, Presentation, PresentingGene};
pub use pathogen::{Pathogen, SpeciesId};
