//! fided - session process binding and companion environment launcher.
//!
//! Root-package build of the `fided` binary; the implementation lives in
//! the `fided` crate.

fn main() -> anyhow::Result<()> {
    fided::cli::main()
}
