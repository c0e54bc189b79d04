//! Linux Console Keymap
//!
//! Reads the kernel's active keymap through the vt ioctls. The console is put
//! in Unicode mode while pages are read so Latin entries come back as code
//! points; the previous mode is restored when the source is dropped.
//!
//! Page reads are all-or-nothing: a single failed `KDGKBENT` fails the whole
//! load. The accent table, LEDs and shift state are best effort and fall back
//! to defaults.

use crate::input::diacritic::DiacriticEntry;
use crate::input::error::{DecoderError, Result};
use crate::input::keymap::{KeymapSource, NR_KEYS};
use crate::input::modifiers::{InitialFlags, LedSet, ModifierSet};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const KDGKBMODE: u32 = 0x4B44;
const KDSKBMODE: u32 = 0x4B45;
const KDGKBENT: u32 = 0x4B46;
const KDGKBDIACR: u32 = 0x4B4A;
const KDGKBLED: u32 = 0x4B64;
const TIOCLINUX: u32 = 0x541C;

const TIOCL_GETSHIFTSTATE: u8 = 6;
const K_UNICODE: libc::c_long = 0x03;

/// `KDGKBENT` value of a page the kernel does not have
const K_NOSUCHMAP: u16 = 0x027F;

/// Kernel keysyms store Unicode entries xor'd with this
const KERNEL_UNICODE_XOR: u16 = 0xF000;

const MAX_DIACR: usize = 256;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct KbEntry {
    kb_table: u8,
    kb_index: u8,
    kb_value: u16,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct KbDiacr {
    diacr: u8,
    base: u8,
    result: u8,
}

#[repr(C)]
struct KbDiacrs {
    kb_cnt: libc::c_uint,
    kbdiacr: [KbDiacr; MAX_DIACR],
}

/// Keymap read from a Linux virtual console
#[derive(Debug)]
pub struct ConsoleKeymap {
    device: PathBuf,
    file: File,
    saved_mode: Option<libc::c_long>,
}

impl ConsoleKeymap {
    /// Open the console device, e.g. `/dev/tty`
    pub fn open(device: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(device)
            .map_err(|e| DecoderError::Console(format!("cannot open {}: {}", device.display(), e)))?;

        debug!("Opened console {:?}", device);

        Ok(Self {
            device: device.to_path_buf(),
            file,
            saved_mode: None,
        })
    }

    fn ioctl<T>(&self, request: u32, arg: *mut T) -> io::Result<()> {
        // SAFETY: every caller passes a pointer to a live, correctly sized
        // repr(C) value matching the request's kernel ABI.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn set_mode(&self, mode: libc::c_long) -> io::Result<()> {
        // SAFETY: KDSKBMODE takes the mode by value.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), KDSKBMODE as _, mode) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Switch to Unicode mode once, remembering the mode to restore
    fn ensure_unicode_mode(&mut self) -> Result<()> {
        if self.saved_mode.is_some() {
            return Ok(());
        }

        let mut mode: libc::c_long = 0;
        self.ioctl(KDGKBMODE, &mut mode)
            .map_err(|e| DecoderError::Console(format!("KDGKBMODE failed: {}", e)))?;
        self.set_mode(K_UNICODE)
            .map_err(|e| DecoderError::Console(format!("KDSKBMODE failed: {}", e)))?;

        self.saved_mode = Some(mode);
        Ok(())
    }

    fn read_entry(&self, table: u8, index: u8) -> Result<u16> {
        let mut entry = KbEntry {
            kb_table: table,
            kb_index: index,
            kb_value: 0,
        };
        self.ioctl(KDGKBENT, &mut entry)
            .map_err(|e| DecoderError::PageLoadFailed {
                page: table,
                reason: format!("KDGKBENT index {}: {}", index, e),
            })?;
        Ok(entry.kb_value)
    }
}

impl KeymapSource for ConsoleKeymap {
    fn name(&self) -> String {
        format!("console:{}", self.device.display())
    }

    fn load_page(&mut self, index: u8) -> Result<Option<Vec<u16>>> {
        self.ensure_unicode_mode()?;

        if self.read_entry(index, 0)? == K_NOSUCHMAP {
            return Ok(None);
        }

        (0..NR_KEYS)
            .map(|code| {
                self.read_entry(index, code as u8)
                    .map(|value| value ^ KERNEL_UNICODE_XOR)
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn load_diacritics(&mut self) -> Result<Option<Vec<DiacriticEntry>>> {
        let mut accents = Box::new(KbDiacrs {
            kb_cnt: 0,
            kbdiacr: [KbDiacr::default(); MAX_DIACR],
        });

        if let Err(e) = self.ioctl(KDGKBDIACR, &mut *accents) {
            debug!("KDGKBDIACR failed ({}), using default accent table", e);
            return Ok(None);
        }

        let count = (accents.kb_cnt as usize).min(MAX_DIACR);
        Ok(Some(
            accents.kbdiacr[..count]
                .iter()
                .map(|d| DiacriticEntry {
                    diacr: d.diacr as u32,
                    base: d.base as u32,
                    result: d.result as u32,
                })
                .collect(),
        ))
    }

    fn initial_flags(&mut self) -> Result<InitialFlags> {
        let mut flags = InitialFlags::default();

        let mut shift_state = [TIOCL_GETSHIFTSTATE, 0u8];
        match self.ioctl(TIOCLINUX, shift_state.as_mut_ptr()) {
            Ok(()) => flags.shift_state = ModifierSet::from_bits_retain(shift_state[0]),
            Err(e) => debug!("TIOCLINUX shift state unavailable: {}", e),
        }

        let mut led_state: libc::c_char = 0;
        match self.ioctl(KDGKBLED, &mut led_state) {
            Ok(()) => flags.leds = LedSet::from_bits_truncate(led_state as u8),
            Err(e) => debug!("KDGKBLED unavailable: {}", e),
        }

        Ok(flags)
    }
}

impl Drop for ConsoleKeymap {
    fn drop(&mut self) {
        if let Some(mode) = self.saved_mode.take() {
            if let Err(e) = self.set_mode(mode) {
                warn!("Failed to restore keyboard mode on {:?}: {}", self.device, e);
            }
        }
    }
}
