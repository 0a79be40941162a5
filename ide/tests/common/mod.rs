#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use block_dev::SECTOR_SIZE;
use ide::{IdeChannel, PortIo, regs};

thread_local! {
    /// 本线程是否处于屏蔽中断的区段；中断线线程始终视为屏蔽
    static MASKED: Cell<bool> = const { Cell::new(false) };
}

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 控制器收到的一条命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issued {
    pub command: u8,
    pub lba: usize,
    pub count: u8,
    pub device: u8,
}

/// 模拟的主 IDE 通道，命令立即完成
#[derive(Debug, Default)]
pub struct SimState {
    pub disk: Vec<u8>,
    pub disk1: bool,
    pub fail: bool,
    pub irq: bool,
    pub issued: Vec<Issued>,
    /// 未屏蔽中断时对端口的访问次数
    pub unmasked: usize,
    nien: bool,
    regs: [u8; 6],
    selected: u8,
    read_data: VecDeque<u8>,
    write_to: Option<(usize, usize)>,
}

impl SimState {
    fn lba(&self) -> usize {
        self.regs[3] as usize
            | (self.regs[4] as usize) << 8
            | (self.regs[5] as usize) << 16
            | ((self.selected_device_byte() & 0x0f) as usize) << 24
    }

    fn selected_device_byte(&self) -> u8 {
        self.regs[0]
    }

    fn raise(&mut self) {
        if !self.nien {
            self.irq = true;
        }
    }

    fn range(&self, lba: usize, count: usize) -> Option<std::ops::Range<usize>> {
        let range = lba * SECTOR_SIZE..(lba + count) * SECTOR_SIZE;
        (range.end <= self.disk.len()).then_some(range)
    }
}

#[derive(Debug, Clone)]
pub struct SimPorts(pub Arc<Mutex<SimState>>);

impl SimPorts {
    pub fn new(sectors: usize) -> Self {
        Self(Arc::new(Mutex::new(SimState {
            disk: vec![0; sectors * SECTOR_SIZE],
            ..SimState::default()
        })))
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.0.lock().unwrap()
    }

    fn access(&self) -> std::sync::MutexGuard<'_, SimState> {
        let mut sim = self.state();
        if !MASKED.get() {
            sim.unmasked += 1;
        }
        sim
    }
}

impl PortIo for SimPorts {
    fn inb(&mut self, port: u16) -> u8 {
        let mut sim = self.access();
        match port {
            regs::STATUS => {
                // 读状态即应答中断
                sim.irq = false;
                if sim.selected == 1 && !sim.disk1 {
                    0
                } else if sim.fail {
                    0x41
                } else {
                    0x40
                }
            }
            regs::ERROR => {
                if sim.fail {
                    0x04
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        let mut sim = self.access();
        match port {
            regs::CONTROL => sim.nien = value & 0x02 != 0,
            regs::DEVICE => {
                sim.regs[0] = value;
                sim.selected = (value >> 4) & 1;
            }
            regs::SECTOR_COUNT..=regs::LBA_HIGH => sim.regs[(port - regs::DATA) as usize] = value,
            regs::COMMAND => {
                let issued = Issued {
                    command: value,
                    lba: sim.lba(),
                    count: sim.regs[2],
                    device: sim.selected,
                };
                sim.issued.push(issued);

                let range = sim.range(issued.lba, issued.count as usize);
                if range.is_none() {
                    sim.fail = true;
                }
                match value {
                    0x20 | 0xc4 => {
                        let data = range.map(|r| sim.disk[r].to_vec()).unwrap_or_default();
                        sim.read_data = data.into();
                        sim.raise();
                    }
                    0x30 | 0xc5 => sim.write_to = range.map(|r| (r.start, r.end)),
                    _ => panic!("unexpected command {value:#x}"),
                }
            }
            _ => {}
        }
    }

    fn insl(&mut self, port: u16, buf: &mut [u8]) {
        assert_eq!(regs::DATA, port);
        let mut sim = self.access();
        for byte in buf {
            *byte = sim.read_data.pop_front().unwrap_or(0);
        }
    }

    fn outsl(&mut self, port: u16, buf: &[u8]) {
        assert_eq!(regs::DATA, port);
        let mut sim = self.access();
        if let Some((start, end)) = sim.write_to.take() {
            assert_eq!(end - start, buf.len());
            sim.disk[start..end].copy_from_slice(buf);
        }
        sim.raise();
    }

    fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
        let masked = MASKED.replace(true);
        let result = f();
        MASKED.set(masked);
        result
    }
}

/// 中断线：观察到中断请求就调用处理例程
pub struct IrqLine {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IrqLine {
    pub fn spawn(channel: Arc<IdeChannel<SimPorts>>, ports: SimPorts) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = stop.clone();
            move || {
                MASKED.set(true);
                while !stop.load(Ordering::Acquire) {
                    let pending = ports.state().irq;
                    if pending {
                        channel.handle_irq();
                    } else {
                        thread::yield_now();
                    }
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for IrqLine {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

/// 每个扇区填上自己的扇区号
pub fn stamp_sectors(ports: &SimPorts) {
    let mut sim = ports.state();
    for (i, sector) in sim.disk.chunks_mut(SECTOR_SIZE).enumerate() {
        sector.fill(i as u8);
    }
}
