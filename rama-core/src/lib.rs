//! Runtime, error and telemetry plumbing shared by the server crates.
//!
//! Crate used by the end-user `rampart` crate and its collaborators alike.

#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub use ::rama_error as error;

pub mod graceful;
pub mod rt;

pub mod telemetry;

pub mod bytes {
    //! Re-export of the [bytes](https://docs.rs/bytes/latest/bytes/) crate.
    //!
    //! Exported for your convenience and because it is so fundamental to rama.

    #[doc(inline)]
    pub use ::bytes::*;
}
