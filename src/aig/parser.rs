use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use crate::{Aig, Result, aig::error::ParserError};

fn read_u64(s: &str) -> std::result::Result<u64, ParserError> {
    s.parse::<u64>()
        .map_err(|_| ParserError::InvalidToken(s.to_string() + " expected u64"))
}

fn check_even(x: u64) -> Result<()> {
    if x & 1 == 1 {
        return Err(ParserError::InvalidToken(
            "expected literal to be even, got ".to_string() + &x.to_string(),
        )
        .into());
    }
    Ok(())
}

/// Reads the next line into `line` (cleared first), failing on end of file.
fn next_line(reader: &mut BufReader<impl Read>, line: &mut String) -> Result<()> {
    line.clear();
    let n = reader.read_line(line).map_err(ParserError::from)?;
    if n == 0 {
        return Err(ParserError::InvalidToken("unexpected end of file".to_string()).into());
    }
    Ok(())
}

/// Reads a line holding exactly one literal, returns it as (id, complement).
fn read_literal(line: &str, what: &str) -> Result<(u64, bool)> {
    let tokens = line.split_whitespace().collect::<Vec<&str>>();

    if tokens.is_empty() {
        return Err(
            ParserError::InvalidToken(format!("expected {} token, got nothing", what)).into(),
        );
    }

    if tokens.len() > 1 {
        return Err(ParserError::InvalidToken(format!(
            "expected nothing after {}, got {}",
            what, tokens[1]
        ))
        .into());
    }

    let lit = read_u64(tokens[0])?;
    Ok((lit >> 1, lit & 1 != 0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    m: u64,
    i: u64,
    l: u64,
    o: u64,
    a: u64,
}

impl TryFrom<&str> for Header {
    type Error = ParserError;

    fn try_from(line: &str) -> std::result::Result<Self, Self::Error> {
        let tokens = line.split_whitespace().collect::<Vec<&str>>();

        if tokens.len() < 6 {
            return Err(ParserError::InvalidToken(
                "missing header tokens".to_string(),
            ));
        }

        if tokens[0] != "aag" && tokens[0] != "aig" {
            return Err(ParserError::InvalidToken(
                "expected aag (or at least aig)".to_string(),
            ));
        }

        let m = read_u64(tokens[1])?;
        let i = read_u64(tokens[2])?;
        let l = read_u64(tokens[3])?;
        let o = read_u64(tokens[4])?;
        let a = read_u64(tokens[5])?;

        if tokens.len() > 6 {
            return Err(ParserError::UnsupportedFeature(
                "header only supports M I L O A".to_string(),
            ));
        }

        // Combinational networks only: miters have no state
        if l > 0 {
            return Err(ParserError::UnsupportedFeature(format!(
                "latches ({} found), only combinational AIGs are supported",
                l
            )));
        }

        Ok(Header { m, i, l, o, a })
    }
}

/// Parser for the ASCII AIGER format.
mod ascii {
    use std::{
        collections::{HashMap, HashSet},
        io::{BufReader, Read},
    };

    use crate::{
        Aig, AigEdge, AigError, NodeId, Result,
        aig::{
            error::ParserError,
            parser::{Header, check_even, next_line, read_literal, read_u64},
        },
    };

    type AndLine = (NodeId, NodeId, bool, NodeId, bool);

    fn read_input(line: &str) -> Result<NodeId> {
        let (id, complement) = read_literal(line, "input")?;
        if complement {
            return Err(ParserError::InvalidToken(format!(
                "expected literal to be even, got {}",
                2 * id + 1
            ))
            .into());
        }
        Ok(id)
    }

    fn read_and(line: &str) -> Result<AndLine> {
        let tokens = line.split_whitespace().collect::<Vec<&str>>();

        if tokens.len() < 3 {
            return Err(ParserError::InvalidToken("not enough and tokens".to_string()).into());
        }

        if tokens.len() > 3 {
            return Err(ParserError::InvalidToken(
                "expected nothing after and tokens, got ".to_string() + tokens[3],
            )
            .into());
        }

        let id = read_u64(tokens[0])?;
        let fanin0 = read_u64(tokens[1])?;
        let fanin1 = read_u64(tokens[2])?;

        check_even(id)?;
        Ok((
            id >> 1,
            fanin0 >> 1,
            fanin0 & 1 != 0,
            fanin1 >> 1,
            fanin1 & 1 != 0,
        ))
    }

    /// Translation of source literal (`id`, `complement`).
    fn mapped(map: &HashMap<NodeId, AigEdge>, id: NodeId, complement: bool) -> Result<AigEdge> {
        map.get(&id)
            .cloned()
            .map(|edge| edge.complement_if(complement))
            .ok_or(AigError::NodeDoesNotExist(id))
    }

    /// Translates and gate `root` (and its not yet translated fanin cone) into `aig`.
    ///
    /// Gates of an ASCII file may come in any order, so we go depth first with an explicit stack.
    fn build_gate(
        aig: &mut Aig,
        root: NodeId,
        defs: &HashMap<NodeId, AndLine>,
        map: &mut HashMap<NodeId, AigEdge>,
    ) -> Result<()> {
        let mut stack = vec![(root, false)];
        let mut in_progress = HashSet::new();

        while let Some((id, fanins_done)) = stack.pop() {
            if map.contains_key(&id) {
                continue;
            }
            let &(_, i0, c0, i1, c1) = defs.get(&id).ok_or(AigError::NodeDoesNotExist(id))?;

            if fanins_done {
                let f0 = mapped(map, i0, c0)?;
                let f1 = mapped(map, i1, c1)?;
                let edge = aig.and(&f0, &f1)?;
                map.insert(id, edge);
                in_progress.remove(&id);
                continue;
            }

            in_progress.insert(id);
            stack.push((id, true));
            for fanin in [i0, i1] {
                if map.contains_key(&fanin) {
                    continue;
                }
                if in_progress.contains(&fanin) {
                    return Err(ParserError::InvalidToken(format!(
                        "combinational cycle through literal {}",
                        2 * fanin
                    ))
                    .into());
                }
                stack.push((fanin, false));
            }
        }
        Ok(())
    }

    impl Aig {
        /// Creates an AIG from an open .aag file using ASCII format.
        ///
        /// Use this function if the file is already open with the reader.
        /// Input ids are kept, and gates are rebuilt through [`Aig::and`] so the result is strashed.
        pub fn from_ascii(mut reader: BufReader<impl Read>) -> Result<Self> {
            let mut line: String = String::new();

            // Reading the header
            next_line(&mut reader, &mut line)?;
            let header = Header::try_from(line.as_str())?;

            let mut inputs = Vec::new();
            for _ in 0..header.i {
                next_line(&mut reader, &mut line)?;
                inputs.push(read_input(&line)?);
            }
            let mut outputs = Vec::new();
            for _ in 0..header.o {
                next_line(&mut reader, &mut line)?;
                outputs.push(read_literal(&line, "output")?);
            }
            let mut defs = HashMap::new();
            for _ in 0..header.a {
                next_line(&mut reader, &mut line)?;
                let and = read_and(&line)?;
                if defs.insert(and.0, and).is_some() {
                    return Err(AigError::DuplicateId(and.0));
                }
            }
            // Ignoring everything else (symbols, comments)

            let mut aig = Aig::new();
            let mut map: HashMap<NodeId, AigEdge> = HashMap::from([(0, aig.false_edge())]);
            for &id in &inputs {
                if defs.contains_key(&id) {
                    return Err(AigError::DuplicateId(id));
                }
                map.insert(id, aig.add_input(id)?);
            }

            for &(id, complement) in &outputs {
                build_gate(&mut aig, id, &defs, &mut map)?;
                let edge = mapped(&map, id, complement)?;
                aig.add_output_edge(&edge)?;
            }

            // Let's clean the useless stuff
            aig.update();
            aig.check_integrity()?;

            Ok(aig)
        }
    }

}

/// Parser for the bin AIGER format.
mod bin {
    use std::io::{BufReader, Read};

    use crate::{
        Aig, AigEdge, AigError, NodeId, Result,
        aig::error::ParserError,
        aig::parser::{Header, next_line, read_literal},
    };

    fn getnoneofch(buf: &[u8], offset: &mut usize) -> Result<u8> {
        if *offset >= buf.len() {
            return Err(ParserError::InvalidToken("unexpected end of file".to_string()).into());
        }

        let byte = buf[*offset];
        *offset += 1;
        Ok(byte)
    }

    fn decode_delta(buf: &[u8], offset: &mut usize) -> Result<u64> {
        let mut x = 0;
        let mut i = 0;

        loop {
            let ch = getnoneofch(buf, offset)?;
            if 7 * i >= u64::BITS {
                return Err(
                    ParserError::InvalidToken("delta does not fit in 64 bits".to_string()).into(),
                );
            }
            x |= ((ch & 0x7f) as u64) << (7 * i);
            i += 1;

            if ch & 0x80 == 0 {
                return Ok(x);
            }
        }
    }

    /// Edge of literal `lit`, among the nodes already translated.
    fn literal_edge(edges: &[AigEdge], lit: u64) -> Result<AigEdge> {
        let var = (lit >> 1) as usize;
        edges
            .get(var)
            .cloned()
            .map(|edge| edge.complement_if(lit & 1 != 0))
            .ok_or(AigError::NodeDoesNotExist(var as NodeId))
    }

    impl Aig {
        /// Creates an AIG from an open .aig file using binary format.
        pub fn from_bin(mut reader: BufReader<impl Read>) -> Result<Self> {
            let mut line: String = String::new();

            // Reading the header
            next_line(&mut reader, &mut line)?;
            let header = Header::try_from(line.as_str())?;
            if header.m != header.i + header.l + header.a {
                return Err(ParserError::InvalidToken(format!(
                    "binary header expects M = I + L + A, got {}",
                    line.trim()
                ))
                .into());
            }

            // Using the binary AIGER format, the AIGER can be built progressively.
            // `edges[var]` is the translation of variable `var`.
            let mut aig = Aig::new();
            let mut edges = vec![aig.false_edge()];
            for i in 1..1 + header.i {
                edges.push(aig.add_input(i)?);
            }

            // Collecting outputs for later
            let mut outputs = Vec::new();
            for _ in 0..header.o {
                next_line(&mut reader, &mut line)?;
                let (id, complement) = read_literal(&line, "output")?;
                outputs.push(2 * id + complement as u64);
            }

            // Register and gates
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(ParserError::from)?;
            let mut offset = 0;
            let mut lhs = 2 * (header.i + 1);
            for _ in 0..header.a {
                let delta0 = decode_delta(&buf, &mut offset)?;
                let delta1 = decode_delta(&buf, &mut offset)?;

                let rhs0 = lhs.checked_sub(delta0).ok_or_else(|| {
                    ParserError::InvalidToken(format!("invalid delta {} for gate {}", delta0, lhs))
                })?;
                let rhs1 = rhs0.checked_sub(delta1).ok_or_else(|| {
                    ParserError::InvalidToken(format!("invalid delta {} for gate {}", delta1, lhs))
                })?;

                let f0 = literal_edge(&edges, rhs0)?;
                let f1 = literal_edge(&edges, rhs1)?;
                let edge = aig.and(&f0, &f1)?;
                edges.push(edge);

                lhs += 2;
            }

            // And finally marking outputs
            for &lit in &outputs {
                let edge = literal_edge(&edges, lit)?;
                aig.add_output_edge(&edge)?;
            }

            // Let's clean the useless stuff
            aig.update();
            aig.check_integrity()?;

            Ok(aig)
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[test]
        fn decode_delta_test() {
            let buf = [0x02, 0x81, 0x01, 0x80];
            let mut offset = 0;
            assert_eq!(decode_delta(&buf, &mut offset).unwrap(), 2);
            assert_eq!(decode_delta(&buf, &mut offset).unwrap(), 129);
            // Unterminated number
            assert!(decode_delta(&buf, &mut offset).is_err());
        }

        #[test]
        fn oversized_delta_is_rejected() {
            let mut buf = vec![0xff; 9];
            buf.push(0x01);
            let mut offset = 0;
            assert!(decode_delta(&buf, &mut offset).is_ok());

            let mut file = b"aig 2 1 0 1 1\n4\n".to_vec();
            file.extend([0xff; 12]);
            assert!(matches!(
                Aig::from_bin(BufReader::new(file.as_slice())),
                Err(AigError::ParserError(ParserError::InvalidToken(_)))
            ));
        }
    }
}

impl Aig {
    /// Creates an AIG from an .aig (resp .aag) file using bin (resp. ASCII) AIGER format.
    ///
    /// Only combinational AIGs are supported: files with latches are rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref()).map_err(ParserError::from)?;
        let reader = BufReader::new(f);
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("aag") => Aig::from_ascii(reader),
            Some("aig") => Aig::from_bin(reader),
            _ => Err(
                ParserError::IoError("invalid extension, expected .aag or .aig".to_string()).into(),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_u64_test() {
        assert!(read_u64("").is_err());
        assert!(read_u64(" ").is_err());
        assert!(read_u64(" 2").is_err());
        assert!(read_u64("2 ").is_err());
        assert!(read_u64("-5").is_err());

        assert_eq!(read_u64("42").unwrap(), 42);
        assert_eq!(read_u64("0").unwrap(), 0);
    }

    #[test]
    fn header_try_from_test() {
        assert!(Header::try_from("").is_err());
        assert!(Header::try_from("aag 0 0 0 0").is_err());

        let h_empty = Header {
            m: 0,
            i: 0,
            l: 0,
            o: 0,
            a: 0,
        };

        assert_eq!(Header::try_from("   aag 0 0 0 0 0 ").unwrap(), h_empty);

        // In theory, this shouldn't work but a lot of people do not care about aig vs aag
        // cf the official benchmarks
        assert_eq!(Header::try_from("aig 0 0 0 0 0").unwrap(), h_empty);

        assert_eq!(
            Header::try_from("aag 19 18 0 0 1     ").unwrap(),
            Header {
                m: 19,
                i: 18,
                l: 0,
                o: 0,
                a: 1
            }
        );

        assert!(Header::try_from("aag 1 1 -1 1 1").is_err());
        assert!(Header::try_from("aag 1 0 1 0 0").is_err());
    }

    #[test]
    fn half_adder_ascii_and_bin_agree() {
        let ascii = Aig::from_file("assets/circuits/half-adder.aag").unwrap();
        let bin = Aig::from_file("assets/circuits/half-adder.aig").unwrap();
        assert_eq!(ascii.get_inputs_id(), vec![1, 2]);
        assert_eq!(ascii.output_count(), 2);
        for bits in 0..4u32 {
            let (a, b) = (bits & 1 != 0, bits & 2 != 0);
            let expected = vec![a ^ b, a && b];
            assert_eq!(ascii.evaluate(&[a, b]).unwrap(), expected);
            assert_eq!(bin.evaluate(&[a, b]).unwrap(), expected);
        }
    }

    #[test]
    fn from_file_bad_extension() {
        assert!(Aig::from_file("Cargo.toml").is_err());
        assert!(Aig::from_file("assets/circuits/does-not-exist.aag").is_err());
    }
}
