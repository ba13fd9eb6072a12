//! 模拟的 ATA 控制器，只实现驱动用到的那部分行为

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::{BlockDevice, DeviceError, Flush, SECTOR_SIZE};
use enumflags2::BitFlags;
use spin::Mutex;

use crate::port::PortIo;
use crate::register::{Command, Status};
use crate::AtaPio;

const BASE: u16 = 0x1F0;
const ALT_STATUS: u16 = 0x3F6;

#[derive(Debug, Default)]
enum Transfer {
    #[default]
    Idle,
    Reading {
        words: Vec<u16>,
        pos: usize,
    },
    Writing {
        lba: u32,
        words: Vec<u16>,
    },
}

#[derive(Debug, Default)]
pub struct Controller {
    sectors: BTreeMap<u32, [u8; SECTOR_SIZE]>,
    lba: [u8; 3],
    drive_head: u8,
    sector_count: u8,
    status: BitFlags<Status>,
    transfer: Transfer,
    /// 命令发出后，状态寄存器还要报告多少次忙碌
    busy_left: usize,

    /* 注入的行为 */
    pub busy_polls: usize,
    pub stuck: bool,
    pub faulty: bool,

    /* 观测记录 */
    pub commands: Vec<u8>,
    pub status_reads: usize,
    pub alt_reads: usize,
    pub flushes: usize,
}

impl Controller {
    fn target(&self) -> u32 {
        u32::from(self.lba[0])
            | u32::from(self.lba[1]) << 8
            | u32::from(self.lba[2]) << 16
            | u32::from(self.drive_head & 0x0F) << 24
    }

    fn command(&mut self, raw: u8) {
        self.commands.push(raw);
        self.busy_left = self.busy_polls;

        if self.faulty {
            self.status = Status::Drdy | Status::Err;
            return;
        }

        let lba = self.target();
        if raw == Command::ReadSectors as u8 {
            let sector = self.sectors.get(&lba).copied().unwrap_or([0; SECTOR_SIZE]);
            let words = sector
                .chunks_exact(2)
                .map(|w| u16::from_le_bytes([w[0], w[1]]))
                .collect();
            self.transfer = Transfer::Reading { words, pos: 0 };
            self.status = Status::Drdy | Status::Drq;
        } else if raw == Command::WriteSectors as u8 {
            self.transfer = Transfer::Writing {
                lba,
                words: Vec::with_capacity(SECTOR_SIZE / 2),
            };
            self.status = Status::Drdy | Status::Drq;
        } else if raw == Command::CacheFlush as u8 {
            self.flushes += 1;
            self.status = Status::Drdy.into();
        }
    }

    fn status(&mut self) -> u8 {
        if self.stuck {
            return Status::Bsy as u8;
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return Status::Bsy as u8;
        }
        self.status.bits()
    }

    fn read_data(&mut self) -> u16 {
        let Transfer::Reading { words, pos } = &mut self.transfer else {
            return 0;
        };
        let word = words[*pos];
        *pos += 1;
        if *pos == words.len() {
            self.transfer = Transfer::Idle;
            self.status = Status::Drdy.into();
        }
        word
    }

    fn write_data(&mut self, word: u16) {
        let Transfer::Writing { lba, words } = &mut self.transfer else {
            return;
        };
        words.push(word);
        if words.len() == SECTOR_SIZE / 2 {
            let mut sector = [0; SECTOR_SIZE];
            for (dst, w) in sector.chunks_exact_mut(2).zip(words.iter()) {
                dst.copy_from_slice(&w.to_le_bytes());
            }
            let lba = *lba;
            self.sectors.insert(lba, sector);
            self.transfer = Transfer::Idle;
            self.status = Status::Drdy.into();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimBus(pub Arc<Mutex<Controller>>);

impl PortIo for SimBus {
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut ctl = self.0.lock();
        match port {
            p if p == BASE + 1 => 0x04, // ABRT
            p if p == BASE + 7 => {
                ctl.status_reads += 1;
                ctl.status()
            }
            ALT_STATUS => {
                ctl.alt_reads += 1;
                ctl.status.bits()
            }
            _ => 0xFF,
        }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let mut ctl = self.0.lock();
        match port - BASE {
            2 => ctl.sector_count = value,
            3 => ctl.lba[0] = value,
            4 => ctl.lba[1] = value,
            5 => ctl.lba[2] = value,
            6 => ctl.drive_head = value,
            7 => ctl.command(value),
            _ => {}
        }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        assert_eq!(port, BASE);
        self.0.lock().read_data()
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        assert_eq!(port, BASE);
        self.0.lock().write_data(value);
    }
}

fn setup() -> (AtaPio<SimBus>, Arc<Mutex<Controller>>) {
    let bus = SimBus::default();
    let ctl = bus.0.clone();
    (AtaPio::new(bus), ctl)
}

fn pattern(seed: u8) -> [u8; SECTOR_SIZE] {
    let mut sector = [0; SECTOR_SIZE];
    for (i, b) in sector.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(7).wrapping_add(seed);
    }
    sector
}

#[test]
fn write_then_read() {
    let (disk, ctl) = setup();
    let data = pattern(3);

    assert_eq!(Ok(Flush::Unconfirmed), disk.write_block(0x0123_4567, &data));
    let mut buf = [0; SECTOR_SIZE];
    disk.read_block(0x0123_4567, &mut buf).unwrap();
    assert_eq!(data, buf);

    let ctl = ctl.lock();
    assert_eq!(Some(&data), ctl.sectors.get(&0x0123_4567));
}

#[test]
fn command_sequence() {
    let (disk, ctl) = setup();
    disk.write_block(0x0A00_0001, &pattern(0)).unwrap();

    let ctl = ctl.lock();
    assert_eq!(0xE0 | 0x0A, ctl.drive_head);
    assert_eq!(1, ctl.sector_count);
    assert_eq!([0x01, 0x00, 0x00], ctl.lba);
    assert_eq!(
        [Command::WriteSectors as u8, Command::CacheFlush as u8],
        ctl.commands[..]
    );
    assert_eq!(1, ctl.flushes);
    assert_eq!(4, ctl.alt_reads);
}

#[test]
fn read_settles_without_flush() {
    let (disk, ctl) = setup();
    let mut buf = [0xAA; SECTOR_SIZE];
    disk.read_block(42, &mut buf).unwrap();
    assert_eq!([0; SECTOR_SIZE], buf);

    let ctl = ctl.lock();
    assert_eq!([Command::ReadSectors as u8], ctl.commands[..]);
    assert_eq!(0, ctl.flushes);
    assert_eq!(4, ctl.alt_reads);
}

#[test]
fn waits_out_busy() {
    let (disk, ctl) = setup();
    ctl.lock().busy_polls = 500;
    disk.write_block(7, &pattern(9)).unwrap();

    let mut buf = [0; SECTOR_SIZE];
    disk.read_block(7, &mut buf).unwrap();
    assert_eq!(pattern(9), buf);
    assert_eq!(2 * 501, ctl.lock().status_reads);
}

#[test]
fn timeout_is_bounded() {
    let (disk, ctl) = setup();
    ctl.lock().stuck = true;

    let mut buf = [0; SECTOR_SIZE];
    assert_eq!(Err(DeviceError::Timeout), disk.read_block(1, &mut buf));
    assert_eq!(AtaPio::<SimBus>::POLL_BUDGET, ctl.lock().status_reads);
}

#[test]
fn error_bit_fails() {
    let (disk, ctl) = setup();
    ctl.lock().faulty = true;

    assert_eq!(Err(DeviceError::Fault), disk.write_block(1, &pattern(1)));
    let ctl = ctl.lock();
    // 出错后不会再发出刷新
    assert_eq!([Command::WriteSectors as u8], ctl.commands[..]);
}

#[test]
fn lba_beyond_28_bits() {
    let (disk, ctl) = setup();
    let mut buf = [0; SECTOR_SIZE];
    assert_eq!(
        Err(DeviceError::OutOfRange),
        disk.read_block(AtaPio::<SimBus>::MAX_LBA + 1, &mut buf)
    );
    assert!(ctl.lock().commands.is_empty());
}
