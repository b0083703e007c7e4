//! OpenFPGA compiler flow: Yosys synthesis, VPR pack/place/route/analysis and
//! OpenFPGA bitstream generation, bound onto the pipeline tasks.

mod bind;
mod openfpga;
pub mod scripts;
mod state;

pub use bind::{apply_disabled, bind_all};
pub use openfpga::OpenFpgaFlow;
pub use state::CompileState;
