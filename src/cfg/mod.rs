//! 基本块与控制流图
//!
//! 所有基本块放在 `Cfg` 的数组里，用 `BlockId` 下标互相引用。边是双向记录的：
//! 给 A 加一条到 B 的出边，同时给 B 加一条来自 A 的入边。

mod check;
mod linearize;

use std::fmt;

use crate::error::{IrError, IrResult};
use crate::tac::{BranchInst, TacInst};

pub use linearize::LinearItem;

/// 每个块最多 3 条入边
pub const MAX_IN_EDGES: usize = 3;
/// 每个块最多 2 条出边
pub const MAX_OUT_EDGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    id: BlockId,
    insts: Vec<TacInst>,
    line: usize,
    loop_depth: usize,
    if_depth: usize,
    preds: Vec<BlockId>,
    succs: Vec<BlockId>,
    comments: Vec<String>,
    /// 只在入口块上有意义：缓存的线性化顺序
    order: Option<Vec<BlockId>>,
}

impl BasicBlock {
    fn new(id: BlockId, line: usize) -> Self {
        Self {
            id,
            insts: Vec::new(),
            line,
            loop_depth: 0,
            if_depth: 0,
            preds: Vec::new(),
            succs: Vec::new(),
            comments: Vec::new(),
            order: None,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn insts(&self) -> &[TacInst] {
        &self.insts
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn loop_depth(&self) -> usize {
        self.loop_depth
    }

    pub fn if_depth(&self) -> usize {
        self.if_depth
    }

    pub fn preds(&self) -> &[BlockId] {
        &self.preds
    }

    pub fn succs(&self) -> &[BlockId] {
        &self.succs
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn last(&self) -> Option<&TacInst> {
        self.insts.last()
    }

    /// 以条件跳转结尾的块已封闭
    pub fn is_sealed(&self) -> bool {
        self.last().is_some_and(TacInst::is_branch)
    }

    pub fn terminator_branch(&self) -> Option<&BranchInst> {
        self.last().and_then(TacInst::as_branch)
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub fn set_loop_depth(&mut self, depth: usize) {
        self.loop_depth = depth;
    }

    pub fn set_if_depth(&mut self, depth: usize) {
        self.if_depth = depth;
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |ids: &[BlockId]| ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        writeln!(
            f,
            "{}: line {}, loop depth {}, if depth {}",
            self.id, self.line, self.loop_depth, self.if_depth
        )?;
        writeln!(f, "  preds: [{}]", list(&self.preds))?;
        write!(f, "  succs: [{}]", list(&self.succs))?;
        for comment in &self.comments {
            write!(f, "\n  // {}", comment)?;
        }
        for inst in &self.insts {
            write!(f, "\n    {}", inst)?;
        }
        Ok(())
    }
}

/// 基本块数组
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// 新建一个空块，编号按创建顺序递增
    pub fn new_block(&mut self, line: usize) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id, line));
        self.invalidate();
        id
    }

    pub fn block(&self, id: BlockId) -> IrResult<&BasicBlock> {
        self.blocks.get(id.index()).ok_or(IrError::UnknownBlock(id))
    }

    /// 可变访问会让所有缓存的顺序失效
    pub fn block_mut(&mut self, id: BlockId) -> IrResult<&mut BasicBlock> {
        self.invalidate();
        self.blocks.get_mut(id.index()).ok_or(IrError::UnknownBlock(id))
    }

    /// 追加指令；块已被条件跳转封闭时失败，指令列表不变
    pub fn append(&mut self, id: BlockId, inst: TacInst) -> IrResult<()> {
        let block = self.block_mut(id)?;
        if block.is_sealed() {
            return Err(IrError::BlockSealed { block: id });
        }
        block.insts.push(inst);
        Ok(())
    }

    /// 加一条 `from -> to` 的边，两端容量都先检查
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> IrResult<()> {
        let out_count = self.block(from)?.succs.len();
        let in_count = self.block(to)?.preds.len();
        if out_count >= MAX_OUT_EDGES {
            return Err(IrError::TooManyOutEdges {
                block: from,
                limit: MAX_OUT_EDGES,
            });
        }
        if in_count >= MAX_IN_EDGES {
            return Err(IrError::TooManyInEdges {
                block: to,
                limit: MAX_IN_EDGES,
            });
        }

        self.invalidate();
        self.blocks[from.index()].succs.push(to);
        self.blocks[to.index()].preds.push(from);
        Ok(())
    }

    /// 删除一条 `from -> to` 的边（重复边只删一条）
    pub fn remove_edge(&mut self, from: BlockId, to: BlockId) -> IrResult<()> {
        let out_pos = self.block(from)?.succs.iter().position(|s| *s == to);
        let in_pos = self.block(to)?.preds.iter().position(|p| *p == from);
        let (Some(out_pos), Some(in_pos)) = (out_pos, in_pos) else {
            return Err(IrError::EdgeNotFound { from, to });
        };

        self.invalidate();
        self.blocks[from.index()].succs.remove(out_pos);
        self.blocks[to.index()].preds.remove(in_pos);
        Ok(())
    }

    fn invalidate(&mut self) {
        for block in &mut self.blocks {
            block.order = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::{BranchInst, CompareOp, ReturnInst};

    #[test]
    fn test_edges_are_mirrored() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        let b = cfg.new_block(2);
        cfg.add_edge(a, b).unwrap();
        assert_eq!(cfg.block(a).unwrap().succs(), [b]);
        assert_eq!(cfg.block(b).unwrap().preds(), [a]);

        cfg.remove_edge(a, b).unwrap();
        assert!(cfg.block(a).unwrap().succs().is_empty());
        assert!(cfg.block(b).unwrap().preds().is_empty());
        assert_eq!(cfg.remove_edge(a, b), Err(IrError::EdgeNotFound { from: a, to: b }));
    }

    #[test]
    fn test_edge_capacity() {
        let mut cfg = Cfg::new();
        let target = cfg.new_block(1);
        let sources: Vec<BlockId> = (0..4).map(|i| cfg.new_block(i)).collect();
        for src in &sources[..3] {
            cfg.add_edge(*src, target).unwrap();
        }
        assert_eq!(
            cfg.add_edge(sources[3], target),
            Err(IrError::TooManyInEdges { block: target, limit: 3 })
        );
        // 失败的加边不改动任何一端
        assert!(cfg.block(sources[3]).unwrap().succs().is_empty());

        let hub = sources[0];
        let x = cfg.new_block(9);
        let y = cfg.new_block(9);
        cfg.add_edge(hub, x).unwrap();
        assert_eq!(
            cfg.add_edge(hub, y),
            Err(IrError::TooManyOutEdges { block: hub, limit: 2 })
        );
    }

    #[test]
    fn test_append_after_branch_fails() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        let t = cfg.new_block(2);
        let e = cfg.new_block(3);
        let branch = BranchInst::new(CompareOp::Eq, "x$l", "0", t, e).unwrap();
        cfg.append(a, branch.into()).unwrap();

        let ret = ReturnInst::new(None).unwrap();
        assert_eq!(cfg.append(a, ret.into()), Err(IrError::BlockSealed { block: a }));
        assert_eq!(cfg.block(a).unwrap().insts().len(), 1);
    }

    #[test]
    fn test_unknown_block() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        let ghost = BlockId::new(7);
        assert_eq!(cfg.add_edge(a, ghost), Err(IrError::UnknownBlock(ghost)));
        assert!(cfg.block(a).unwrap().succs().is_empty());
    }

    #[test]
    fn test_block_rendering() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(4);
        let b = cfg.new_block(5);
        cfg.add_edge(a, b).unwrap();
        cfg.block_mut(a).unwrap().add_comment("entry");
        cfg.append(a, ReturnInst::new(Some("1".into())).unwrap().into()).unwrap();
        assert_eq!(
            cfg.block(a).unwrap().to_string(),
            "B0: line 4, loop depth 0, if depth 0\n  preds: []\n  succs: [B1]\n  // entry\n    return 1;"
        );
    }
}
