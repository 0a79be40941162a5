//! # IDE 块设备驱动
//!
//! 一条 IDE 通道上同一时刻只有一个在途请求，即请求队列的队首。
//! 请求完成由中断处理例程([`IdeChannel::handle_irq`])驱动；
//! 中断尚未接通时切到 [`IoMode::Poll`]，由等待者自行轮询完成。
//!
//! 硬件访问全部经过 [`PortIo`]，便于在宿主机上以模拟控制器测试。

#![no_std]

extern crate alloc;

mod channel;
mod partition;
mod port;
mod probe;
pub mod queue;
pub mod regs;

pub use self::{
    channel::{BlockRequest, IdeChannel, IoMode, Op, Park, SpinPark},
    partition::IdePartition,
    port::PortIo,
};

#[cfg(target_arch = "x86_64")]
pub use self::port::Pio;
