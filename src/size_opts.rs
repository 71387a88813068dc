//! The two link-time size-optimization portions.
//!
//! Neither has ever been observed with a body; they are modeled as
//! presence-only markers until evidence emerges that they can hold units.

use std::io::{self, Write};

use crate::version::VersionRange;

#[derive(Debug, Default)]
pub struct SizeDecreasingOptimizations {
    pub versions: VersionRange,
}

#[derive(Debug, Default)]
pub struct SizeIncreasingOptimizations {
    pub versions: VersionRange,
}

impl SizeDecreasingOptimizations {
    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\nLinktime size-decreasing optimizations\r\n")?;
        *line_number += 2;
        Ok(())
    }
}

impl SizeIncreasingOptimizations {
    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\nLinktime size-increasing optimizations\r\n")?;
        *line_number += 2;
        Ok(())
    }
}
