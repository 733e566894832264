//! 遥测发布
//!
//! 仿真器把机械臂状态和场景物体写入键值存储，每个 tick 提交一次快照，
//! 供外部可视化工具读取。键名格式为 `<名称>::<字段>`，例如：
//!
//! - `panda::joint_positions`、`panda::joint_velocities`
//! - `panda::ee_position`、`panda::ee_velocity`
//! - `<物体>::position`
//!
//! `set()` 更新存储中的值（后写覆盖），`commit()` 把整个存储作为一帧发布。
//! 遥测失败只记录日志，不会中断控制循环。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// 一帧遥测数据
pub type TelemetryFrame = BTreeMap<String, Vec<f64>>;

/// 遥测错误
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Telemetry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 遥测后端
pub trait Telemetry {
    /// 阻塞直到后端就绪（例如可视化客户端已连接）
    fn wait_until_ready(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }

    /// 写入一个键
    fn set(&mut self, key: &str, values: &[f64]) -> Result<(), TelemetryError>;

    /// 发布当前存储的快照
    fn commit(&mut self) -> Result<(), TelemetryError>;
}

/// 丢弃所有数据
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn set(&mut self, _key: &str, _values: &[f64]) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// 内存后端，保存所有已提交的帧
#[derive(Debug, Default, Clone)]
pub struct MemoryTelemetry {
    store: TelemetryFrame,
    frames: Vec<TelemetryFrame>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交的帧
    pub fn frames(&self) -> &[TelemetryFrame] {
        &self.frames
    }

    /// 最近一次提交的帧
    pub fn last_frame(&self) -> Option<&TelemetryFrame> {
        self.frames.last()
    }

    /// 存储中某个键的当前值（不要求已提交）
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.store.get(key).map(Vec::as_slice)
    }
}

impl Telemetry for MemoryTelemetry {
    fn set(&mut self, key: &str, values: &[f64]) -> Result<(), TelemetryError> {
        self.store.insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TelemetryError> {
        self.frames.push(self.store.clone());
        Ok(())
    }
}

/// JSON Lines 后端：每次提交写一行 JSON 对象
///
/// ```text
/// {"time":[0.001],"panda::ee_position":[0.375,0.0,0.313],...}
/// ```
#[derive(Debug)]
pub struct JsonLinesTelemetry<W: Write> {
    writer: W,
    store: TelemetryFrame,
    committed: u64,
}

impl<W: Write> JsonLinesTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            store: TelemetryFrame::new(),
            committed: 0,
        }
    }

    /// 已提交的帧数
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// 取回底层 writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesTelemetry<BufWriter<File>> {
    /// 创建（或截断）输出文件
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TelemetryError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> Telemetry for JsonLinesTelemetry<W> {
    fn set(&mut self, key: &str, values: &[f64]) -> Result<(), TelemetryError> {
        self.store.insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TelemetryError> {
        serde_json::to_writer(&mut self.writer, &self.store)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.committed += 1;
        Ok(())
    }
}

impl<T: Telemetry + ?Sized> Telemetry for Box<T> {
    fn wait_until_ready(&mut self) -> Result<(), TelemetryError> {
        (**self).wait_until_ready()
    }

    fn set(&mut self, key: &str, values: &[f64]) -> Result<(), TelemetryError> {
        (**self).set(key, values)
    }

    fn commit(&mut self) -> Result<(), TelemetryError> {
        (**self).commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_telemetry_snapshots() {
        let mut telemetry = MemoryTelemetry::new();
        telemetry.set("box::position", &[0.1, 0.2, 0.3]).unwrap();
        telemetry.set("panda::ee_position", &[0.0, 0.0, 1.0]).unwrap();
        assert!(telemetry.frames().is_empty());

        telemetry.commit().unwrap();
        telemetry.set("panda::ee_position", &[0.0, 0.0, 0.5]).unwrap();
        telemetry.commit().unwrap();

        assert_eq!(telemetry.frames().len(), 2);
        assert_eq!(telemetry.frames()[0]["panda::ee_position"], vec![0.0, 0.0, 1.0]);
        let last = telemetry.last_frame().unwrap();
        assert_eq!(last["panda::ee_position"], vec![0.0, 0.0, 0.5]);
        // 未重新写入的键保留在后续帧中
        assert_eq!(last["box::position"], vec![0.1, 0.2, 0.3]);
        assert_eq!(telemetry.get("box::position"), Some(&[0.1, 0.2, 0.3][..]));
    }

    #[test]
    fn test_json_lines_output() {
        let mut telemetry = JsonLinesTelemetry::new(Vec::new());
        telemetry.set("time", &[0.001]).unwrap();
        telemetry.set("panda::joint_positions", &[0.0, 1.5]).unwrap();
        telemetry.commit().unwrap();
        telemetry.set("time", &[0.002]).unwrap();
        telemetry.commit().unwrap();
        assert_eq!(telemetry.committed(), 2);

        let output = String::from_utf8(telemetry.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["time"][0], 0.001);
        assert_eq!(first["panda::joint_positions"][1], 1.5);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["time"][0], 0.002);
    }

    #[test]
    fn test_json_lines_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        {
            let mut telemetry = JsonLinesTelemetry::create(&path).unwrap();
            telemetry.set("cube::position", &[1.0, 2.0, 3.0]).unwrap();
            telemetry.commit().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), r#"{"cube::position":[1.0,2.0,3.0]}"#);
    }

    #[test]
    fn test_boxed_telemetry() {
        let mut telemetry: Box<dyn Telemetry> = Box::new(NullTelemetry);
        assert!(telemetry.wait_until_ready().is_ok());
        assert!(telemetry.set("a", &[1.0]).is_ok());
        assert!(telemetry.commit().is_ok());
    }
}
