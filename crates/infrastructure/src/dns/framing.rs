//! RFC 1035 §4.2.2 TCP framing: every DNS message on a stream is preceded
//! by a two-byte big-endian length.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uwsgi_dns_domain::DomainError;

pub async fn write_framed<S>(stream: &mut S, message: &[u8]) -> Result<(), DomainError>
where
    S: AsyncWriteExt + Unpin,
{
    if message.len() > u16::MAX as usize {
        return Err(DomainError::IoError(format!(
            "message of {} bytes does not fit a TCP frame",
            message.len()
        )));
    }
    let length = (message.len() as u16).to_be_bytes();

    stream
        .write_all(&length)
        .await
        .map_err(|e| DomainError::IoError(format!("writing length prefix: {e}")))?;
    stream
        .write_all(message)
        .await
        .map_err(|e| DomainError::IoError(format!("writing DNS message: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| DomainError::IoError(format!("flushing stream: {e}")))?;
    Ok(())
}

pub async fn read_framed<S>(stream: &mut S) -> Result<Vec<u8>, DomainError>
where
    S: AsyncReadExt + Unpin,
{
    let mut length = [0u8; 2];
    stream
        .read_exact(&mut length)
        .await
        .map_err(|e| DomainError::IoError(format!("reading length prefix: {e}")))?;

    let mut message = vec![0u8; u16::from_be_bytes(length) as usize];
    stream
        .read_exact(&mut message)
        .await
        .map_err(|e| DomainError::IoError(format!("reading DNS message: {e}")))?;
    Ok(message)
}
