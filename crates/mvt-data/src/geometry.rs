use thiserror::Error;

const MOVE_TO: u32 = 1;
const LINE_TO: u32 = 2;
const CLOSE_PATH: u32 = 7;

/// A malformed geometry command stream. Scoped to one feature; the rest of
/// the tile keeps rendering.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unknown geometry command {0}")]
    UnknownCommand(u32),
    #[error("geometry parameters run past the end of the stream")]
    Truncated,
}

/// One step of a feature's path, with the delta-encoded cursor already
/// accumulated into absolute tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCommand {
    MoveTo { x: i32, y: i32 },
    LineTo { x: i32, y: i32 },
    /// Closes the current subpath; drawing resumes at the subpath start.
    Close,
}

/// Decodes a zig-zag encoded geometry parameter.
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Iterator over a feature's geometry command stream.
///
/// Each integer packs a command id in the low 3 bits and a repeat count in
/// the rest; MoveTo/LineTo consume one zig-zag delta pair per repeat. The
/// cursor starts at the origin and persists across commands within the
/// feature.
pub struct PathCommands<'a> {
    geometry: &'a [u32],
    pos: usize,
    x: i32,
    y: i32,
    command: u32,
    remaining: u32,
}

impl<'a> PathCommands<'a> {
    pub fn new(geometry: &'a [u32]) -> Self {
        Self {
            geometry,
            pos: 0,
            x: 0,
            y: 0,
            command: 0,
            remaining: 0,
        }
    }

    fn next_point(&mut self) -> Result<(i32, i32), GeometryError> {
        let raw_x = *self.geometry.get(self.pos).ok_or(GeometryError::Truncated)?;
        let raw_y = *self
            .geometry
            .get(self.pos + 1)
            .ok_or(GeometryError::Truncated)?;
        self.pos += 2;
        self.x = self.x.wrapping_add(zigzag_decode(raw_x));
        self.y = self.y.wrapping_add(zigzag_decode(raw_y));
        Ok((self.x, self.y))
    }
}

impl Iterator for PathCommands<'_> {
    type Item = Result<PathCommand, GeometryError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining == 0 {
            if self.pos >= self.geometry.len() {
                return None;
            }
            let header = self.geometry[self.pos];
            self.pos += 1;
            self.command = header & 0x7;
            self.remaining = header >> 3;
            if !matches!(self.command, MOVE_TO | LINE_TO | CLOSE_PATH) {
                // Nothing after an unknown command can be trusted.
                self.pos = self.geometry.len();
                self.remaining = 0;
                return Some(Err(GeometryError::UnknownCommand(self.command)));
            }
        }

        self.remaining -= 1;
        let command = match self.command {
            MOVE_TO => self.next_point().map(|(x, y)| PathCommand::MoveTo { x, y }),
            LINE_TO => self.next_point().map(|(x, y)| PathCommand::LineTo { x, y }),
            _ => Ok(PathCommand::Close),
        };
        Some(command)
    }
}
