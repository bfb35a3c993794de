//! 线性化：把控制流图排成一条指令流
//!
//! 从入口做深度优先的前序遍历，条件跳转先展开真分支再展开假分支，已排入的块不再
//! 排入。输出时，若块的落空后继（条件跳转的假目标，或唯一后继）不是下一个块，
//! 就补一条无条件跳转。

use std::fmt;

use tracing::{debug, trace};

use crate::error::{IrError, IrResult};
use crate::tac::TacInst;
use super::{BlockId, Cfg};

/// 线性指令流中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearItem {
    Label(BlockId),
    Inst(TacInst),
    Jump(BlockId),
}

impl fmt::Display for LinearItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearItem::Label(id) => write!(f, "{}:", id),
            LinearItem::Inst(inst) => write!(f, "    {}", inst),
            LinearItem::Jump(id) => write!(f, "    goto {};", id),
        }
    }
}

impl Cfg {
    /// 遍历时的后继顺序：条件跳转的真目标排在最前
    fn successors_in_order(&self, id: BlockId) -> IrResult<Vec<BlockId>> {
        let block = self.block(id)?;
        let mut succs = block.succs().to_vec();
        if let Some(branch) = block.terminator_branch() {
            if let Some(pos) = succs.iter().position(|s| *s == branch.on_true()) {
                let first = succs.remove(pos);
                succs.insert(0, first);
            }
        }
        Ok(succs)
    }

    /// 从入口块开始的块顺序，结果缓存在入口块上
    pub fn linearize(&mut self, entry: BlockId) -> IrResult<Vec<BlockId>> {
        let block = self.block(entry)?;
        if !block.preds().is_empty() {
            return Err(IrError::EntryHasPredecessors {
                block: entry,
                count: block.preds().len(),
            });
        }
        if let Some(order) = &block.order {
            return Ok(order.clone());
        }

        let mut order = Vec::new();
        let mut visited = vec![false; self.len()];
        let mut stack = vec![entry];
        while let Some(id) = stack.pop() {
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;
            order.push(id);
            trace!(block = %id, position = order.len() - 1, "block ordered");

            for succ in self.successors_in_order(id)?.into_iter().rev() {
                if !visited[succ.index()] {
                    stack.push(succ);
                }
            }
        }

        self.blocks[entry.index()].order = Some(order.clone());
        debug!(entry = %entry, blocks = order.len(), "cfg linearized");
        Ok(order)
    }

    /// 按线性顺序输出标号、指令和必要的跳转
    pub fn emit(&mut self, entry: BlockId) -> IrResult<Vec<LinearItem>> {
        let order = self.linearize(entry)?;
        let mut items = Vec::new();
        let mut jumps = 0;

        for (i, &id) in order.iter().enumerate() {
            let next = order.get(i + 1).copied();
            let block = self.block(id)?;
            items.push(LinearItem::Label(id));
            items.extend(block.insts().iter().cloned().map(LinearItem::Inst));

            let fall_through = match block.last() {
                Some(inst) if inst.is_return() => None,
                Some(inst) => match inst.as_branch() {
                    Some(branch) => Some(branch.on_false()),
                    None => block.succs().first().copied(),
                },
                None => block.succs().first().copied(),
            };
            if let Some(target) = fall_through {
                if next != Some(target) {
                    items.push(LinearItem::Jump(target));
                    jumps += 1;
                }
            }
        }

        debug!(entry = %entry, blocks = order.len(), jumps, "cfg emitted");
        Ok(items)
    }

    /// 线性指令流的文本形式，一项一行
    pub fn render_linear(&mut self, entry: BlockId) -> IrResult<String> {
        let items = self.emit(entry)?;
        Ok(items.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))
    }
}
