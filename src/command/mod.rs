pub mod maskprimers;

pub use maskprimers::AlignCMD;
pub use maskprimers::ExtractCMD;
pub use maskprimers::MaskPrimers;
pub use maskprimers::ScoreCMD;
