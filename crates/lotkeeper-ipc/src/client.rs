//! IPC client for gate terminals and operator consoles
//!
//! [`IpcClient::send`] speaks raw protocol. The typed helpers
//! (`check_in`, `check_out`, ...) unwrap the expected payload and turn a
//! rejected request into [`IpcError::Rejected`] so callers can match on
//! the error code.

use lotkeeper_api::{
    CheckInRequest, Command, Event, HistoricalRecord, LotStateSnapshot, OccupancySummary, Request,
    Response, ResponsePayload, ResponseResult, Session,
};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::{IpcError, IpcResult};

/// Connection to lotkeeperd
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for the response carrying its request id
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut json = serde_json::to_string(&Request::new(request_id, command))?;
        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;

        let line = read_line(&mut self.reader).await?;
        let response: Response = serde_json::from_str(&line)?;
        if response.request_id != request_id {
            return Err(IpcError::UnexpectedResponse(format!(
                "response to request {} while waiting for {}",
                response.request_id, request_id
            )));
        }
        Ok(response)
    }

    /// Send a command and return its payload
    pub async fn call(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(info) => Err(IpcError::Rejected(info)),
        }
    }

    pub async fn check_in(&mut self, request: CheckInRequest) -> IpcResult<Session> {
        match self.call(Command::CheckIn(request)).await? {
            ResponsePayload::CheckedIn(session) => Ok(session),
            other => Err(unexpected("checked_in", &other)),
        }
    }

    pub async fn manual_check_in(&mut self, plate: &str, driver: &str) -> IpcResult<Session> {
        let command = Command::ManualCheckIn {
            plate: plate.to_string(),
            driver: driver.to_string(),
        };
        match self.call(command).await? {
            ResponsePayload::CheckedIn(session) => Ok(session),
            other => Err(unexpected("checked_in", &other)),
        }
    }

    /// Check the vehicle out and return its billed record
    pub async fn check_out(&mut self, plate: &str) -> IpcResult<HistoricalRecord> {
        let command = Command::CheckOut {
            plate: plate.to_string(),
        };
        match self.call(command).await? {
            ResponsePayload::CheckedOut(record) => Ok(record),
            other => Err(unexpected("checked_out", &other)),
        }
    }

    pub async fn active_sessions(&mut self) -> IpcResult<Vec<Session>> {
        match self.call(Command::ListActiveSessions).await? {
            ResponsePayload::Sessions { sessions } => Ok(sessions),
            other => Err(unexpected("sessions", &other)),
        }
    }

    pub async fn summary(&mut self) -> IpcResult<OccupancySummary> {
        match self.call(Command::GetSummary).await? {
            ResponsePayload::Summary(summary) => Ok(summary),
            other => Err(unexpected("summary", &other)),
        }
    }

    pub async fn state(&mut self) -> IpcResult<LotStateSnapshot> {
        match self.call(Command::GetState).await? {
            ResponsePayload::State(state) => Ok(state),
            other => Err(unexpected("state", &other)),
        }
    }

    /// Subscribe to events. The connection then only carries events.
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        match self.call(Command::SubscribeEvents).await? {
            ResponsePayload::Subscribed { .. } => Ok(EventStream {
                reader: self.reader,
                _writer: self.writer,
            }),
            other => Err(unexpected("subscribed", &other)),
        }
    }
}

/// Events pushed by lotkeeperd to a subscribed connection
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
    // Dropping the write half would shut down our side of the socket
    _writer: OwnedWriteHalf,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        let line = read_line(&mut self.reader).await?;
        Ok(serde_json::from_str(&line)?)
    }
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> IpcResult<String> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::ConnectionClosed);
    }
    Ok(line.trim().to_string())
}

fn unexpected(expected: &str, got: &ResponsePayload) -> IpcError {
    IpcError::UnexpectedResponse(format!("expected {}, got {:?}", expected, got))
}
