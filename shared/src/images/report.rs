use core::fmt::{self, Write};

use super::registry::ImageRegistry;

impl ImageRegistry {
    /// Writes one line per tag for the operator console:
    ///
    /// ```text
    /// tag  addr     size
    /// 0001 90008000 00180000 +
    /// ```
    ///
    /// The last column is `ImageState::code`.
    pub fn dump_stats<W: Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "tag  addr     size")?;
        for (tag, region) in self.iter() {
            writeln!(
                out,
                "{:04} {:08x} {:08x} {}",
                tag.as_raw(),
                region.display_address(),
                region.status.size,
                region.state().code()
            )?;
        }
        Ok(())
    }
}
