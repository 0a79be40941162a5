//! IDE 通道与请求
//!
//! 通道锁保护端口、请求队列与各请求的完成标志。
//! 锁只在操作队列、编程寄存器与检查标志时持有，等待时释放。
//! 线程上下文持锁期间屏蔽本核中断，中断处理例程因而不会撞上本核持有的锁。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use block_dev::{BlockError, SECTOR_SIZE};
use spin::{Mutex, MutexGuard};

use crate::port::PortIo;
use crate::queue::RequestQueue;
use crate::regs::{self, Command, Status};

/// 等待与唤醒的接缝，默认忙等
pub trait Park: Send + Sync {
    /// 等待者释放通道锁后调用，返回后重新检查完成标志
    fn park(&self) {
        core::hint::spin_loop();
    }

    /// 每完成一个请求调用一次
    fn unpark(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SpinPark;

impl Park for SpinPark {}

/// IO方式
///
/// 中断接通前只能轮询，例如启动时读取分区表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Interrupt,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

/// 一次块读写请求，由队列与等待者共享
pub struct BlockRequest {
    pub device: u8,
    /// 设备上的绝对块号
    pub block: usize,
    pub op: Op,
    data: Mutex<Vec<u8>>,
    done: AtomicBool,
    failed: AtomicBool,
}

impl fmt::Debug for BlockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRequest")
            .field("device", &self.device)
            .field("block", &self.block)
            .field("op", &self.op)
            .field("done", &self.is_done())
            .finish()
    }
}

impl BlockRequest {
    fn new(device: u8, block: usize, op: Op, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            device,
            block,
            op,
            data: Mutex::new(data),
            done: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        })
    }

    pub fn read(device: u8, block: usize, len: usize) -> Arc<Self> {
        Self::new(device, block, Op::Read, vec![0; len])
    }

    pub fn write(device: u8, block: usize, data: &[u8]) -> Arc<Self> {
        Self::new(device, block, Op::Write, data.to_vec())
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn data(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock()
    }

    fn finish(&self, failed: bool) {
        self.failed.store(failed, Ordering::Release);
        self.done.store(true, Ordering::Release);
    }
}

struct Channel<P> {
    ports: P,
    /// 队首是正在由硬件处理的请求
    queue: RequestQueue<Arc<BlockRequest>>,
}

pub struct IdeChannel<P> {
    inner: Mutex<Channel<P>>,
    block_size: usize,
    sectors: usize,
    interrupt: AtomicBool,
    park: Box<dyn Park>,
}

impl<P> fmt::Debug for IdeChannel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdeChannel")
            .field("block_size", &self.block_size)
            .field("sectors", &self.sectors)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl<P> IdeChannel<P> {
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn sectors_per_block(&self) -> usize {
        self.sectors
    }

    pub fn mode(&self) -> IoMode {
        if self.interrupt.load(Ordering::Acquire) {
            IoMode::Interrupt
        } else {
            IoMode::Poll
        }
    }

    pub fn set_mode(&self, mode: IoMode) {
        log::info!("ide: switch to {mode:?} mode");
        self.interrupt
            .store(mode == IoMode::Interrupt, Ordering::Release);
    }
}

impl<P: PortIo> IdeChannel<P> {
    /// 以轮询方式启动，等待方式为忙等
    pub fn new(ports: P, block_size: usize) -> Self {
        Self::with_park(ports, block_size, SpinPark)
    }

    /// 逻辑块超过 7 个扇区时无法配置，直接 panic
    pub fn with_park(ports: P, block_size: usize, park: impl Park + 'static) -> Self {
        let sectors = block_size / SECTOR_SIZE;
        if sectors == 0 || block_size % SECTOR_SIZE != 0 {
            log::error!("ide: block size {block_size} is not a whole number of sectors");
            panic!("ide: block size {block_size} is not a whole number of sectors");
        }
        if sectors > regs::MAX_SECTORS_PER_BLOCK {
            log::error!("ide: {sectors} sectors per block, at most 7 supported");
            panic!("ide: {sectors} sectors per block, at most 7 supported");
        }

        Self {
            inner: Mutex::new(Channel {
                ports,
                queue: RequestQueue::new(),
            }),
            block_size,
            sectors,
            interrupt: AtomicBool::new(false),
            park: Box::new(park),
        }
    }

    /// 线程上下文中取通道锁
    fn exclusive_session<V>(&self, f: impl FnOnce(&mut Channel<P>) -> V) -> V {
        P::without_interrupts(|| f(&mut self.inner.lock()))
    }

    /// 队列中尚未完成的请求数，含在途请求
    pub fn pending(&self) -> usize {
        self.exclusive_session(|channel| channel.queue.len())
    }

    /// 在通道锁内直接访问端口
    pub(crate) fn with_ports<V>(&self, f: impl FnOnce(&mut P) -> V) -> V {
        self.exclusive_session(|channel| f(&mut channel.ports))
    }

    /// 提交请求并等待其完成
    pub fn submit(&self, request: &Arc<BlockRequest>) -> Result<(), BlockError> {
        if request.data().len() != self.block_size {
            return Err(BlockError::BufferSize);
        }
        log::trace!(
            "ide: {:?} block {} on disk {}",
            request.op,
            request.block,
            request.device
        );

        self.exclusive_session(|channel| {
            channel.queue.enq(request.clone());
            if channel.queue.len() == 1 {
                self.start(channel, request);
            }
        });

        loop {
            let done = self.exclusive_session(|channel| {
                if !request.is_done() && self.mode() == IoMode::Poll {
                    self.poll(channel);
                }
                request.is_done()
            });
            if done {
                break;
            }
            self.park.park();
        }

        if request.is_failed() {
            Err(BlockError::Device)
        } else {
            Ok(())
        }
    }

    /// 中断处理例程：完成队首请求并启动下一个，从不等待硬件。
    ///
    /// 只在中断上下文调用，此时本核中断已屏蔽。
    pub fn handle_irq(&self) {
        let mut channel = self.inner.lock();
        if channel.queue.is_empty() {
            // 读状态以应答中断
            channel.ports.inb(regs::STATUS);
            log::trace!("ide: spurious interrupt");
            return;
        }
        self.complete(&mut channel);
    }

    /// 控制器空闲时代替中断完成队首
    fn poll(&self, channel: &mut Channel<P>) {
        let status = Status::decode(channel.ports.inb(regs::STATUS));
        if !status.contains(Status::Bsy)
            && status.intersects(Status::Drdy | Status::Err | Status::Df)
        {
            self.complete(channel);
        }
    }

    fn complete(&self, channel: &mut Channel<P>) {
        let Some(request) = channel.queue.deq() else {
            return;
        };

        let status = Status::decode(channel.ports.inb(regs::STATUS));
        let failed = status.intersects(Status::Err | Status::Df);
        if failed {
            let error = channel.ports.inb(regs::ERROR);
            log::warn!(
                "ide: {:?} block {} failed, status {status:?}, error {error:#04x}",
                request.op,
                request.block
            );
        } else if request.op == Op::Read {
            channel.ports.insl(regs::DATA, &mut request.data());
        }
        request.finish(failed);
        self.park.unpark();

        if let Some(next) = channel.queue.peek().cloned() {
            self.start(channel, &next);
        }
    }

    /// 为请求编程寄存器；写请求随后经数据端口送出数据
    fn start(&self, channel: &mut Channel<P>, request: &BlockRequest) {
        let ports = &mut channel.ports;
        wait_ready(ports);

        let interrupt = self.mode() == IoMode::Interrupt;
        // nIEN 置位即屏蔽中断
        ports.outb(regs::CONTROL, if interrupt { 0 } else { 0x02 });

        let lba = request.block * self.sectors;
        ports.outb(regs::SECTOR_COUNT, self.sectors as u8);
        ports.outb(regs::LBA_LOW, lba as u8);
        ports.outb(regs::LBA_MID, (lba >> 8) as u8);
        ports.outb(regs::LBA_HIGH, (lba >> 16) as u8);
        ports.outb(regs::DEVICE, regs::device_select(request.device, lba));

        let single = self.sectors == 1;
        let command = match request.op {
            Op::Read if single => Command::Read,
            Op::Read => Command::ReadMulti,
            Op::Write if single => Command::Write,
            Op::Write => Command::WriteMulti,
        };
        ports.outb(regs::COMMAND, command as u8);
        if request.op == Op::Write {
            ports.outsl(regs::DATA, &request.data());
        }
    }
}

/// 等待控制器不忙
fn wait_ready<P: PortIo>(ports: &mut P) {
    loop {
        let status = Status::decode(ports.inb(regs::STATUS));
        if !status.contains(Status::Bsy)
            && status.intersects(Status::Drdy | Status::Err | Status::Df)
        {
            return;
        }
        core::hint::spin_loop();
    }
}
