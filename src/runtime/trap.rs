//! `Trap`: a WebAssembly-level trap (division by zero, out-of-bounds
//! memory access, an invalid float-to-int conversion, an out-of-range
//! branch). Deliberately plain data, not a `std::error::Error` — it
//! propagates through child frames as a value carried on the frame,
//! never raised via `?`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trap {
    pub message: String,
}

impl Trap {
    pub fn new(message: impl Into<String>) -> Self {
        Trap {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Trap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trap: {}", self.message)
    }
}
