//! Line-oriented JSON wire protocol.
//!
//! Every frame is one JSON object terminated by `\n`. The server sends a
//! handshake (`<id>\n<size>\n` plus wall records) followed by one batch of
//! entity records per tick; clients send one [`ControlCommand`] per line.

use crate::entities::{Beam, Powerup, Projectile, Tank, Wall};
use crate::vector::Vector2D;
use crate::MAX_LINE_LENGTH;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Frame terminator for every message in both directions.
pub const TERMINATOR: u8 = b'\n';

/// Errors raised while decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record is not a json object")]
    NotAnObject,

    #[error("record carries no discriminant key")]
    MissingDiscriminant,

    #[error("record carries several discriminant keys: {0:?}")]
    AmbiguousDiscriminant(Vec<&'static str>),

    #[error("invalid handshake line: {0:?}")]
    InvalidHandshake(String),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Movement intent carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Unit heading for this intent; `None` has no heading.
    pub fn heading(&self) -> Option<Vector2D> {
        match self {
            Self::None => None,
            Self::Up => Some(Vector2D::UP),
            Self::Down => Some(Vector2D::DOWN),
            Self::Left => Some(Vector2D::LEFT),
            Self::Right => Some(Vector2D::RIGHT),
        }
    }
}

/// Weapon intent carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FireMode {
    #[default]
    None,
    Main,
    Alt,
}

impl FireMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "main" => Some(Self::Main),
            "alt" => Some(Self::Alt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Main => "main",
            Self::Alt => "alt",
        }
    }
}

/// Field-for-field image of a command line as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    moving: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tdir: Option<Vector2D>,
}

/// One client intent. Unrecognized field values decode to `None`, which the
/// world treats as "leave this aspect unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawCommand", into = "RawCommand")]
pub struct ControlCommand {
    pub moving: Option<MoveDirection>,
    pub fire: Option<FireMode>,
    pub tdir: Option<Vector2D>,
}

impl From<RawCommand> for ControlCommand {
    fn from(raw: RawCommand) -> Self {
        Self {
            moving: raw.moving.as_deref().and_then(MoveDirection::parse),
            fire: raw.fire.as_deref().and_then(FireMode::parse),
            tdir: raw.tdir,
        }
    }
}

impl From<ControlCommand> for RawCommand {
    fn from(cmd: ControlCommand) -> Self {
        Self {
            moving: cmd.moving.map(|m| m.as_str().to_string()),
            fire: cmd.fire.map(|f| f.as_str().to_string()),
            tdir: cmd.tdir,
        }
    }
}

impl ControlCommand {
    pub fn new(moving: MoveDirection, fire: FireMode, tdir: Vector2D) -> Self {
        Self {
            moving: Some(moving),
            fire: Some(fire),
            tdir: Some(tdir),
        }
    }

    pub fn fire_mode(&self) -> FireMode {
        self.fire.unwrap_or_default()
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode_line(self)
    }
}

/// Discriminant of a server-to-client record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Tank,
    Projectile,
    Powerup,
    Wall,
    Beam,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Tank,
        RecordKind::Projectile,
        RecordKind::Powerup,
        RecordKind::Wall,
        RecordKind::Beam,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Tank => "tank",
            Self::Projectile => "proj",
            Self::Powerup => "power",
            Self::Wall => "wall",
            Self::Beam => "beam",
        }
    }

    /// Finds the single discriminant key present on `object`.
    pub fn detect(object: &Map<String, Value>) -> Result<Self, ProtocolError> {
        let present: Vec<RecordKind> = Self::ALL
            .into_iter()
            .filter(|kind| object.contains_key(kind.key()))
            .collect();

        match present.as_slice() {
            [] => Err(ProtocolError::MissingDiscriminant),
            [kind] => Ok(*kind),
            many => Err(ProtocolError::AmbiguousDiscriminant(
                many.iter().map(|k| k.key()).collect(),
            )),
        }
    }
}

/// One server-to-client record, decoded once and dispatched on its kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WireRecord {
    Tank(Tank),
    Projectile(Projectile),
    Powerup(Powerup),
    Wall(Wall),
    Beam(Beam),
}

impl WireRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Tank(_) => RecordKind::Tank,
            Self::Projectile(_) => RecordKind::Projectile,
            Self::Powerup(_) => RecordKind::Powerup,
            Self::Wall(_) => RecordKind::Wall,
            Self::Beam(_) => RecordKind::Beam,
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line.trim_end())?;
        let kind = match value.as_object() {
            Some(object) => RecordKind::detect(object)?,
            None => return Err(ProtocolError::NotAnObject),
        };

        let record = match kind {
            RecordKind::Tank => Self::Tank(serde_json::from_value(value)?),
            RecordKind::Projectile => Self::Projectile(serde_json::from_value(value)?),
            RecordKind::Powerup => Self::Powerup(serde_json::from_value(value)?),
            RecordKind::Wall => Self::Wall(serde_json::from_value(value)?),
            RecordKind::Beam => Self::Beam(serde_json::from_value(value)?),
        };
        Ok(record)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode_line(self)
    }
}

/// Serializes `value` as a single newline-terminated frame.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(value)?;
    line.push(TERMINATOR as char);
    Ok(line)
}

/// Startup information the server sends right after a client names itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub player_id: i32,
    pub world_size: u32,
}

impl Handshake {
    /// Renders the id/size preamble followed by one record per wall.
    pub fn encode(&self, walls: &[Wall]) -> Result<String, ProtocolError> {
        let mut out = format!("{}\n{}\n", self.player_id, self.world_size);
        for wall in walls {
            out.push_str(&encode_line(wall)?);
        }
        Ok(out)
    }

    pub fn decode(id_line: &str, size_line: &str) -> Result<Self, ProtocolError> {
        let player_id = id_line
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidHandshake(id_line.to_string()))?;
        let world_size = size_line
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidHandshake(size_line.to_string()))?;
        Ok(Self {
            player_id,
            world_size,
        })
    }
}

/// Reads the next line from `reader`, terminator stripped.
///
/// Returns `Ok(None)` at end of stream; an unterminated tail is discarded.
/// Lines longer than [`MAX_LINE_LENGTH`] fail with
/// [`ProtocolError::LineTooLong`] and leave the stream mid-line, so callers
/// should drop the connection.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    // Room for the longest accepted line plus "\r\n".
    let limit = MAX_LINE_LENGTH as u64 + 2;
    let mut line = String::new();
    let n = (&mut *reader).take(limit).read_line(&mut line).await?;

    if !line.ends_with(TERMINATOR as char) {
        if n as u64 >= limit {
            return Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH));
        }
        return Ok(None);
    }

    line.pop();
    if line.ends_with('\r') {
        line.pop();
    }
    if line.len() > MAX_LINE_LENGTH {
        return Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH));
    }
    Ok(Some(line))
}
