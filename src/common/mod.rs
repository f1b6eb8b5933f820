pub mod dna;
pub mod record;

pub use record::{Annotations, SeqRecord};
