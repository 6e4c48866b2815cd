// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use super::{Ack, WireRequest, MAX_RECORD_BYTES};
use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, AsyncWriteExt};
use libp2p::core::upgrade::{read_length_prefixed, write_length_prefixed};
use libp2p::request_response::ProtocolName;
use serde::{de::DeserializeOwned, Serialize};
use std::io;

/// One of the three (plus reserved) direct-messaging protocol names, carried
/// as data so a single [`WireCodec`] instance serves all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireProtocol(pub &'static str);

impl ProtocolName for WireProtocol {
    fn protocol_name(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[derive(Clone, Default)]
pub struct WireCodec;

#[async_trait]
impl libp2p::request_response::Codec for WireCodec {
    type Protocol = WireProtocol;
    type Request = WireRequest;
    type Response = Ack;

    async fn read_request<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        read_and_decode(io).await
    }

    async fn read_response<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        read_and_decode(io).await
    }

    async fn write_request<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        req: Self::Request,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        encode_and_write(io, &req).await
    }

    async fn write_response<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        res: Self::Response,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        encode_and_write(io, &res).await
    }
}

async fn encode_and_write<IO, T>(io: &mut IO, data: &T) -> io::Result<()>
where
    IO: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = bincode::serialize(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record of {} bytes exceeds the {MAX_RECORD_BYTES} byte limit", bytes.len()),
        ));
    }
    write_length_prefixed(io, bytes).await?;
    io.close().await?;
    Ok(())
}

async fn read_and_decode<IO, T>(io: &mut IO) -> io::Result<T>
where
    IO: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let bytes = read_length_prefixed(io, MAX_RECORD_BYTES).await?;
    if bytes.is_empty() {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    bincode::deserialize(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
