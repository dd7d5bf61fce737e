use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{MAX_STRING_SIZE, MAX_VARINT_LEN};
use crate::{Error, Result};

/// An extension trait on [`AsyncBufRead`] providing `RowBinary` primitives.
///
/// Buffering is part of the contract: end-of-stream detection peeks one byte
/// without consuming it, which needs the reader's internal buffer. Wrap raw
/// streams in [`tokio::io::BufReader`].
pub trait RowBinaryRead: AsyncBufRead + Unpin + Send + Sync {
    fn read_var_uint(&mut self) -> impl Future<Output = Result<u64>> + Send + '_;

    fn read_string(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send + '_;

    fn read_utf8_string(&mut self) -> impl Future<Output = Result<String>> + Send + '_ {
        async { Ok(String::from_utf8(self.read_string().await?)?) }
    }

    /// Returns the next byte without consuming it, or `None` at end of
    /// stream.
    fn peek_u8(&mut self) -> impl Future<Output = Result<Option<u8>>> + Send + '_;
}

impl<T: AsyncBufRead + Unpin + Send + Sync> RowBinaryRead for T {
    async fn read_var_uint(&mut self) -> Result<u64> {
        let mut out = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let octet = self.read_u8().await?;
            // The 10th group carries bit 63 only; anything above overflows.
            if i == MAX_VARINT_LEN - 1 && octet & 0xFE != 0 {
                return Err(Error::Protocol("varint overflows u64".into()));
            }
            out |= u64::from(octet & 0x7F) << (7 * i);
            if octet & 0x80 == 0 {
                return Ok(out);
            }
        }
        Err(Error::Protocol("varint overflows u64".into()))
    }

    async fn read_string(&mut self) -> Result<Vec<u8>> {
        #[expect(clippy::cast_possible_truncation)]
        let len = self.read_var_uint().await? as usize;
        if len > MAX_STRING_SIZE {
            return Err(Error::Protocol(format!("string too large: {len} > {MAX_STRING_SIZE}")));
        }
        if len == 0 {
            return Ok(vec![]);
        }
        let mut buf = vec![0u8; len];
        let _ = self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn peek_u8(&mut self) -> Result<Option<u8>> {
        let buf = self.fill_buf().await?;
        Ok(buf.first().copied())
    }
}

/// An extension trait on [`AsyncWrite`] providing `RowBinary` primitives.
pub trait RowBinaryWrite: AsyncWrite + Unpin + Send + Sync {
    fn write_var_uint(&mut self, value: u64) -> impl Future<Output = Result<()>> + Send + '_;

    fn write_string<V: AsRef<[u8]> + Send>(
        &mut self,
        value: V,
    ) -> impl Future<Output = Result<()>> + Send + use<'_, Self, V>;
}

impl<T: AsyncWrite + Unpin + Send + Sync> RowBinaryWrite for T {
    async fn write_var_uint(&mut self, mut value: u64) -> Result<()> {
        let mut buf = [0u8; 10];
        let mut pos = 0;

        #[expect(clippy::cast_possible_truncation)]
        while pos < buf.len() {
            let mut byte = value & 0x7F;
            value >>= 7;
            if value > 0 {
                byte |= 0x80;
            }
            buf[pos] = byte as u8;
            pos += 1;
            if value == 0 {
                break;
            }
        }
        self.write_all(&buf[..pos]).await?;
        Ok(())
    }

    async fn write_string<V: AsRef<[u8]> + Send>(&mut self, value: V) -> Result<()> {
        let value = value.as_ref();
        self.write_var_uint(value.len() as u64).await?;
        self.write_all(value).await?;
        Ok(())
    }
}

/// [`bytes::BufMut`] extension for building canonical type headers in memory.
pub(crate) trait RowBinaryBytesWrite: bytes::BufMut {
    fn put_var_uint(&mut self, value: u64);

    fn put_string<V: AsRef<[u8]>>(&mut self, value: V);
}

impl<T: bytes::BufMut> RowBinaryBytesWrite for T {
    fn put_var_uint(&mut self, mut value: u64) {
        let mut buf = [0u8; 10];
        let mut pos = 0;

        #[expect(clippy::cast_possible_truncation)]
        while pos < buf.len() {
            let mut byte = value & 0x7F;
            value >>= 7;
            if value > 0 {
                byte |= 0x80;
            }
            buf[pos] = byte as u8;
            pos += 1;
            if value == 0 {
                break;
            }
        }
        self.put_slice(&buf[..pos]);
    }

    fn put_string<V: AsRef<[u8]>>(&mut self, value: V) {
        let value = value.as_ref();
        self.put_var_uint(value.len() as u64);
        self.put_slice(value);
    }
}
