//! 字节流抽象层.
//!
//! 媒体源通过 [`ByteStream`] 读取容器数据, 底层可以是文件或内存缓冲区.
//! 每个后端声明自身能力 ([`ByteStreamCaps`]), 处理器据此拒绝不可读的流.

use std::io::{self, Read, Seek};
use std::path::Path;

use bitflags::bitflags;
use ogv_core::{OgvError, OgvResult};

bitflags! {
    /// 字节流能力位掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ByteStreamCaps: u32 {
        /// 可读
        const READABLE = 1 << 0;
        /// 可随机访问
        const SEEKABLE = 1 << 1;
    }
}

/// 字节流后端 trait
///
/// 实现此 trait 以支持不同的数据来源.
pub trait ByteStreamBackend: Send {
    /// 读取数据到缓冲区
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位 (seek)
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
    /// 后端能力
    fn capabilities(&self) -> ByteStreamCaps;
}

/// 默认缓冲区大小 (16 KB)
const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// 带读缓冲的字节流
pub struct ByteStream {
    /// 内部后端
    inner: Box<dyn ByteStreamBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

impl ByteStream {
    /// 从后端创建字节流
    pub fn new(backend: Box<dyn ByteStreamBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 以只读方式打开本地文件
    pub fn open_read(path: impl AsRef<Path>) -> OgvResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从内存数据创建
    pub fn from_memory(data: Vec<u8>) -> Self {
        Self::new(Box::new(MemoryBackend::from_data(data)))
    }

    /// 后端能力
    pub fn capabilities(&self) -> ByteStreamCaps {
        self.inner.capabilities()
    }

    /// 是否可读
    pub fn is_readable(&self) -> bool {
        self.capabilities().contains(ByteStreamCaps::READABLE)
    }

    /// 是否支持随机访问
    pub fn is_seekable(&self) -> bool {
        self.capabilities().contains(ByteStreamCaps::SEEKABLE)
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }

    /// 读取指定字节数
    pub fn read_exact(&mut self, buf: &mut [u8]) -> OgvResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(OgvError::Eof);
                }
            }
        }
        Ok(())
    }

    /// 尽量填满缓冲区, 返回实际读取字节数 (到达末尾时可能不足)
    pub fn read_up_to(&mut self, count: usize) -> OgvResult<Vec<u8>> {
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            if self.buf_pos == self.buf_len {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    break;
                }
            }
            let to_copy = (self.buf_len - self.buf_pos).min(count - out.len());
            out.extend_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
            self.buf_pos += to_copy;
        }
        Ok(out)
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> OgvResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取小端 u32
    pub fn read_u32_le(&mut self) -> OgvResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// 读取小端 u64
    pub fn read_u64_le(&mut self) -> OgvResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// 读取 4 字节标签
    pub fn read_tag(&mut self) -> OgvResult<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> OgvResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 定位 (seek)
    ///
    /// 注意: seek 会清空读缓冲区.
    pub fn seek(&mut self, pos: io::SeekFrom) -> OgvResult<u64> {
        if !self.is_seekable() {
            return Err(OgvError::Unsupported("字节流不支持随机访问".into()));
        }
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 获取当前位置
    ///
    /// 考虑读缓冲区中尚未消耗的数据量.
    pub fn position(&mut self) -> OgvResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }
}

/// 文件后端
struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl ByteStreamBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn capabilities(&self) -> ByteStreamCaps {
        ByteStreamCaps::READABLE | ByteStreamCaps::SEEKABLE
    }
}

/// 内存缓冲区后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
    /// 声明的能力
    caps: ByteStreamCaps,
}

impl MemoryBackend {
    /// 从已有数据创建 (可读, 可随机访问)
    pub fn from_data(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            caps: ByteStreamCaps::READABLE | ByteStreamCaps::SEEKABLE,
        }
    }

    /// 覆盖声明的能力
    pub fn with_capabilities(mut self, caps: ByteStreamCaps) -> Self {
        self.caps = caps;
        self
    }
}

impl ByteStreamBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => self.data.len() as i64 + offset,
            io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn capabilities(&self) -> ByteStreamCaps {
        self.caps
    }
}
