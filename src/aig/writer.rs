use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{Aig, AigEdge, AigNode, NodeId, Result, aig::error::ParserError};

impl Aig {
    /// Writes the AIG using the ASCII AIGER format.
    ///
    /// Variables are renumbered: inputs first (declaration order) then and gates in topological order,
    /// so reading the file back yields inputs `1..=I` in the same order.
    pub fn write_ascii(&self, mut w: impl Write) -> Result<()> {
        let mut vars: HashMap<NodeId, u64> = HashMap::from([(0, 0)]);
        for (k, id) in self.get_inputs_id().into_iter().enumerate() {
            vars.insert(id, k as u64 + 1);
        }
        let ands = self.get_and_nodes();
        let i = self.input_count() as u64;
        for (k, node) in ands.iter().enumerate() {
            vars.insert(node.get_id(), i + 1 + k as u64);
        }
        let lit = |edge: &AigEdge| -> u64 {
            2 * vars.get(&edge.get_node_id()).copied().unwrap_or(0) + edge.get_complement() as u64
        };

        let mut text = format!(
            "aag {} {} 0 {} {}\n",
            i + ands.len() as u64,
            i,
            self.output_count(),
            ands.len()
        );
        for var in 1..=i {
            text += &format!("{}\n", 2 * var);
        }
        for output in &self.outputs {
            text += &format!("{}\n", lit(output));
        }
        for node in &ands {
            if let AigNode::And { id, fanin0, fanin1 } = node.as_ref() {
                let (l0, l1) = (lit(fanin0), lit(fanin1));
                text += &format!("{} {} {}\n", 2 * vars[id], l0.max(l1), l0.min(l1));
            }
        }

        w.write_all(text.as_bytes()).map_err(ParserError::from)?;
        Ok(())
    }

    /// Writes the AIG to an .aag file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("aag") => (),
            _ => {
                return Err(
                    ParserError::IoError("invalid extension, expected .aag".to_string()).into(),
                );
            }
        }
        let f = File::create(path.as_ref()).map_err(ParserError::from)?;
        let mut w = BufWriter::new(f);
        self.write_ascii(&mut w)?;
        w.flush().map_err(ParserError::from)?;
        Ok(())
    }
}
