//! Block Cipher Stream
//!
//! ChaCha20-Poly1305 によるブロック単位のストリーム暗号化
//!
//! ```text
//! | magic (8) | base nonce (12) | block 0 (<= 64 KiB + 16 tag) | block 1 | ...
//! ```
//!
//! ブロック i の nonce は base nonce にリトルエンディアンで i を加算したもの。
//! 最後のブロックは AAD `[1]`、それ以外は `[0]` で封緘する。空の平文も空の最終ブロックを1つ持つので、
//! ブロック境界での切り詰めは復号時に検出される。

use std::io;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::task::{Context, Poll};

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use tokio::io::{AsyncRead, ReadBuf};

use crate::domain::errors::{Result, WatchupError};

pub const MAGIC: &[u8; 8] = b"WATCHUP\0";
pub const HEADER_LEN: usize = MAGIC.len() + NONCE_LEN;
pub const BLOCK_SIZE: usize = 64 * 1024;
pub const TAG_LEN: usize = 16;

const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;
const PBKDF2_SALT: &[u8] = b"watchup/crypt/v1";

/// パスワードから導出した暗号鍵
#[derive(Clone)]
pub struct CryptKey([u8; KEY_LEN]);

impl CryptKey {
    /// PBKDF2-HMAC-SHA256 で鍵を導出する
    pub fn derive(password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(WatchupError::Configuration(
                "crypt password must not be empty".to_string(),
            ));
        }

        let mut key = [0u8; KEY_LEN];
        let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).expect("iterations are non-zero");
        ring::pbkdf2::derive(
            ring::pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            PBKDF2_SALT,
            password.as_bytes(),
            &mut key,
        );
        Ok(Self(key))
    }

    fn aead(&self) -> LessSafeKey {
        let unbound =
            UnboundKey::new(&CHACHA20_POLY1305, &self.0).expect("key length matches algorithm");
        LessSafeKey::new(unbound)
    }
}

impl std::fmt::Debug for CryptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CryptKey(..)")
    }
}

/// 平文サイズから暗号文サイズを求める
pub fn encrypted_size(plain: u64) -> u64 {
    let blocks = plain.div_ceil(BLOCK_SIZE as u64).max(1);
    HEADER_LEN as u64 + plain + blocks * TAG_LEN as u64
}

/// 暗号文サイズから平文サイズを求める。ありえないサイズなら `None`
pub fn decrypted_size(encrypted: u64) -> Option<u64> {
    let body = encrypted.checked_sub(HEADER_LEN as u64)?;
    let frame = (BLOCK_SIZE + TAG_LEN) as u64;
    let full = body / frame;
    let rest = body % frame;

    if rest == 0 && full > 0 {
        Some(full * BLOCK_SIZE as u64)
    } else if rest == TAG_LEN as u64 && full == 0 {
        Some(0)
    } else if rest <= TAG_LEN as u64 {
        None
    } else {
        Some(full * BLOCK_SIZE as u64 + rest - TAG_LEN as u64)
    }
}

fn block_aad(last: bool) -> Aad<[u8; 1]> {
    Aad::from([u8::from(last)])
}

fn advance(nonce: &mut [u8; NONCE_LEN]) {
    for byte in nonce.iter_mut() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            break;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// 下位のストリームをブロック単位で暗号化/復号しながら読み出すストリーム
pub struct CryptReader<R> {
    inner: R,
    key: LessSafeKey,
    direction: Direction,
    nonce: [u8; NONCE_LEN],
    header_done: bool,
    input: Vec<u8>,
    output: Vec<u8>,
    output_pos: usize,
    inner_eof: bool,
    done: bool,
}

impl<R: AsyncRead + Unpin> CryptReader<R> {
    /// 平文を読み、暗号文を出力するストリーム
    pub fn encrypt(inner: R, key: &CryptKey) -> Result<Self> {
        let mut nonce = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce)
            .map_err(|_| WatchupError::Io(io::Error::other("random nonce generation failed")))?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&nonce);

        Ok(Self {
            inner,
            key: key.aead(),
            direction: Direction::Encrypt,
            nonce,
            header_done: true,
            input: Vec::with_capacity(BLOCK_SIZE),
            output: header,
            output_pos: 0,
            inner_eof: false,
            done: false,
        })
    }

    /// 暗号文を読み、平文を出力するストリーム
    pub fn decrypt(inner: R, key: &CryptKey) -> Self {
        Self {
            inner,
            key: key.aead(),
            direction: Direction::Decrypt,
            nonce: [0u8; NONCE_LEN],
            header_done: false,
            input: Vec::with_capacity(BLOCK_SIZE + TAG_LEN),
            output: Vec::new(),
            output_pos: 0,
            inner_eof: false,
            done: false,
        }
    }

    fn block_len(&self) -> usize {
        match (self.direction, self.header_done) {
            (Direction::Decrypt, false) => HEADER_LEN,
            (Direction::Decrypt, true) => BLOCK_SIZE + TAG_LEN,
            (Direction::Encrypt, _) => BLOCK_SIZE,
        }
    }

    /// 最終ブロックかどうか判定するため、本体は1バイト先まで読む
    fn frame_len(&self) -> usize {
        if self.header_done {
            self.block_len() + 1
        } else {
            self.block_len()
        }
    }

    /// 1フレーム分たまるか下位ストリームが終わるまで読み込む
    fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let frame_len = self.frame_len();
        while self.input.len() < frame_len && !self.inner_eof {
            let start = self.input.len();
            self.input.resize(frame_len, 0);
            let mut buf = ReadBuf::new(&mut self.input[start..]);

            match Pin::new(&mut self.inner).poll_read(cx, &mut buf) {
                Poll::Ready(Ok(())) => {
                    let n = buf.filled().len();
                    self.input.truncate(start + n);
                    if n == 0 {
                        self.inner_eof = true;
                    }
                }
                Poll::Ready(Err(e)) => {
                    self.input.truncate(start);
                    return Poll::Ready(Err(e));
                }
                Poll::Pending => {
                    self.input.truncate(start);
                    return Poll::Pending;
                }
            }
        }
        Poll::Ready(Ok(()))
    }

    /// たまったフレームを変換して出力バッファに移す
    fn process_frame(&mut self) -> io::Result<()> {
        if self.direction == Direction::Decrypt && !self.header_done {
            if self.input.len() < HEADER_LEN || &self.input[..MAGIC.len()] != MAGIC {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "not an encrypted object (bad header)",
                ));
            }
            self.nonce.copy_from_slice(&self.input[MAGIC.len()..HEADER_LEN]);
            self.input.clear();
            self.header_done = true;
            return Ok(());
        }

        let block_len = self.block_len();
        let lookahead = if self.input.len() > block_len {
            self.input.split_off(block_len)
        } else {
            Vec::new()
        };
        let last = lookahead.is_empty();

        let nonce = Nonce::assume_unique_for_key(self.nonce);
        let mut block = std::mem::take(&mut self.input);

        match self.direction {
            Direction::Encrypt => {
                let tag = self
                    .key
                    .seal_in_place_separate_tag(nonce, block_aad(last), &mut block)
                    .map_err(|_| io::Error::other("encryption failed"))?;
                block.extend_from_slice(tag.as_ref());
            }
            Direction::Decrypt => {
                if block.len() < TAG_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "truncated encrypted object",
                    ));
                }
                let plain_len = self
                    .key
                    .open_in_place(nonce, block_aad(last), &mut block)
                    .map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "encrypted block failed authentication")
                    })?
                    .len();
                block.truncate(plain_len);
            }
        }

        advance(&mut self.nonce);
        self.output = block;
        self.output_pos = 0;
        self.input = lookahead;
        self.input.reserve(self.frame_len());
        self.done = last;
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CryptReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if this.output_pos < this.output.len() {
                let n = buf.remaining().min(this.output.len() - this.output_pos);
                buf.put_slice(&this.output[this.output_pos..this.output_pos + n]);
                this.output_pos += n;
                return Poll::Ready(Ok(()));
            }
            if this.done {
                return Poll::Ready(Ok(()));
            }

            match this.poll_fill(cx) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
            this.process_frame()?;
        }
    }
}
