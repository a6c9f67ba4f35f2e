//! TCP connection to the arena server: join handshake, frame intake and
//! command sending.

use crate::game::{ClientWorld, WorldEvent};
use log::{debug, info};
use shared::{read_line, ControlCommand, Handshake, ProtocolError, MAX_NAME_LENGTH};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server closed the connection")]
    Closed,

    #[error("player name must be 1 to 16 characters on one line")]
    InvalidName,
}

/// Checks a player name before it is sent as the first line.
pub fn validate_name(name: &str) -> Result<(), ClientError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_LENGTH || name.contains(['\n', '\r']) {
        return Err(ClientError::InvalidName);
    }
    Ok(())
}

/// A joined connection and the world it mirrors
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    world: ClientWorld,
}

impl Client {
    /// Connects, sends the player name and waits for the id and size lines.
    pub async fn connect(addr: &str, name: &str) -> Result<Self, ClientError> {
        validate_name(name)?;

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, mut writer) = stream.into_split();
        writer.write_all(format!("{}\n", name).as_bytes()).await?;

        let mut reader = BufReader::new(read_half);
        let id_line = read_line(&mut reader).await?.ok_or(ClientError::Closed)?;
        let size_line = read_line(&mut reader).await?.ok_or(ClientError::Closed)?;

        let handshake = Handshake::decode(&id_line, &size_line)?;
        info!(
            "Joined {} as player {} in a {} unit world",
            addr, handshake.player_id, handshake.world_size
        );

        Ok(Self {
            reader,
            writer,
            world: ClientWorld::new(handshake.player_id, handshake.world_size),
        })
    }

    pub fn player_id(&self) -> i32 {
        self.world.player_id
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    /// Waits for at least one complete record line, applies every complete
    /// line received so far as one frame and returns the events it produced.
    pub async fn receive(&mut self) -> Result<Vec<WorldEvent>, ClientError> {
        let mut events = Vec::new();
        loop {
            let line = self.next_line().await?;
            events.extend(self.world.apply_line(&line));
            if !self.reader.buffer().contains(&b'\n') {
                break;
            }
        }
        self.world.advance_frame();
        Ok(events)
    }

    async fn next_line(&mut self) -> Result<String, ClientError> {
        read_line(&mut self.reader).await?.ok_or(ClientError::Closed)
    }

    pub async fn send_command(&mut self, command: &ControlCommand) -> Result<(), ClientError> {
        let line = command.encode()?;
        self.writer.write_all(line.as_bytes()).await?;
        debug!("Sent {}", line.trim_end());
        Ok(())
    }

    /// Sends raw text, terminator included. Used to exercise the server with
    /// arbitrary frames.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ClientError> {
        self.writer.write_all(text.as_bytes()).await?;
        Ok(())
    }

    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{FireMode, MoveDirection, Vector2D};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("alice").is_ok());
        assert!(validate_name("sixteen_chars_ok").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("seventeen_chars_x").is_err());
        assert!(validate_name("two\nlines").is_err());
    }

    #[tokio::test]
    async fn test_connect_reads_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"tester\n");

            stream
                .write_all(
                    b"2\n1500\n{\"wall\":0,\"p1\":{\"x\":0.0,\"y\":0.0},\"p2\":{\"x\":0.0,\"y\":100.0}}\n",
                )
                .await
                .unwrap();

            let n = stream.read(&mut buf).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let mut client = Client::connect(&addr, "tester").await.unwrap();
        assert_eq!(client.player_id(), 2);
        assert_eq!(client.world().world_size, 1500);

        client.receive().await.unwrap();
        assert_eq!(client.world().walls.len(), 1);

        let cmd = ControlCommand::new(MoveDirection::Up, FireMode::None, Vector2D::UP);
        client.send_command(&cmd).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(ControlCommand::decode(&received).unwrap(), cmd);
    }

    #[tokio::test]
    async fn test_connect_fails_when_server_hangs_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let result = Client::connect(&addr, "tester").await;
        assert!(matches!(
            result,
            Err(ClientError::Closed) | Err(ClientError::Io(_)) | Err(ClientError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_receive_rejects_oversized_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(b"0\n2000\n").await.unwrap();

            let flood = vec![b'{'; shared::MAX_LINE_LENGTH + 10];
            let _ = stream.write_all(&flood).await;
            let _ = stream.read(&mut buf).await;
        });

        let mut client = Client::connect(&addr, "tester").await.unwrap();
        let result = client.receive().await;
        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::LineTooLong(_)))
        ));
    }
}
