use std::{
    fmt,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
    str::{FromStr, SplitWhitespace},
};
use tracing::{info, warn};

use super::error::BackupError;

/// Snapshot of a network: topology, learning rate and coefficients.
///
/// `weights[layer][neuron]` holds the incoming weights of that neuron followed by its
/// bias. The input layer owns no connections, its entry is a placeholder.
///
/// The text form (see `Display` and `FromStr`) is:
/// ```text
/// <layer count>
/// <size_0> <size_1> ... <size_N-1>
/// <learning rate>
///
///
/// <w_1> ... <w_prev> <bias>      one line per neuron of layer 1
///                                blank line after each layer
/// ...
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Backup {
    topology: Vec<usize>,
    learning_rate: f64,
    weights: Vec<Vec<Vec<f64>>>,
}

impl Backup {
    pub fn new(topology: Vec<usize>, learning_rate: f64, weights: Vec<Vec<Vec<f64>>>) -> Self {
        Backup {
            topology,
            learning_rate,
            weights,
        }
    }

    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn weights(&self) -> &[Vec<Vec<f64>>] {
        &self.weights
    }

    pub fn into_parts(self) -> (Vec<usize>, f64, Vec<Vec<Vec<f64>>>) {
        (self.topology, self.learning_rate, self.weights)
    }

    /// Writes the text form into `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), BackupError> {
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the text form into the file at `path`, replacing it.
    ///
    /// # Examples
    /// ```no_run
    /// # use neuronet::feedforward::Network;
    /// let net = Network::new(&[3, 4, 4, 1], 0.05).unwrap();
    /// net.serialize().save_to_file("XOR3.txt").unwrap();
    /// ```
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), BackupError> {
        let path = path.as_ref();
        let result = File::create(path)
            .map_err(BackupError::from)
            .and_then(|file| self.write_to(BufWriter::new(file)));
        match &result {
            Ok(()) => info!(path = %path.display(), topology = ?self.topology, "backup written"),
            Err(err) => warn!(path = %path.display(), %err, "backup not written"),
        }
        result
    }

    /// Reads the text form from `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Backup, BackupError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        text.parse()
    }

    /// Reads the text form from the file at `path`.
    ///
    /// On `Err` there is no partial backup to build a network from.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Backup, BackupError> {
        let path = path.as_ref();
        let result = File::open(path)
            .map_err(BackupError::from)
            .and_then(Backup::read_from);
        match &result {
            Ok(backup) => info!(path = %path.display(), topology = ?backup.topology, "backup read"),
            Err(err) => warn!(path = %path.display(), %err, "backup not read"),
        }
        result
    }
}

impl fmt::Display for Backup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.topology.len())?;
        for size in &self.topology {
            write!(f, "{} ", size)?;
        }
        writeln!(f)?;
        writeln!(f, "{:?}", self.learning_rate)?;
        writeln!(f)?;
        writeln!(f)?;

        // Input layer holds no connections, so it has no block
        for layer in self.weights.iter().skip(1) {
            for neuron in layer {
                for coeff in neuron {
                    write!(f, "{:?} ", coeff)?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Whitespace separated tokens of a weight file.
struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next<T: FromStr>(&mut self, what: &'static str) -> Result<T, BackupError> {
        let token = self.iter.next().ok_or(BackupError::UnexpectedEnd(what))?;
        token.parse().map_err(|_| BackupError::Malformed {
            what,
            token: token.to_owned(),
        })
    }
}

impl FromStr for Backup {
    type Err = BackupError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens {
            iter: text.split_whitespace(),
        };

        let layers_count: usize = tokens.next("layer count")?;
        if layers_count < 2 {
            return Err(BackupError::Malformed {
                what: "layer count",
                token: layers_count.to_string(),
            });
        }
        let topology = (0..layers_count)
            .map(|_| tokens.next("layer size"))
            .collect::<Result<Vec<usize>, _>>()?;

        let learning_rate: f64 = tokens.next("learning rate")?;

        let mut weights = Vec::with_capacity(topology.len());
        for pair in topology.windows(2) {
            let (prev_size, size) = (pair[0], pair[1]);
            let layer = (0..size)
                .map(|_| {
                    // `prev_size` weights + bias
                    (0..=prev_size)
                        .map(|_| tokens.next("coefficient"))
                        .collect::<Result<Vec<f64>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            weights.push(layer);
        }
        // Placeholder for the input layer: a single zero per neuron, sized only once
        // the coefficients behind the header are read
        weights.insert(0, vec![vec![0.0]; topology[0]]);

        Ok(Backup {
            topology,
            learning_rate,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Backup {
        Backup::new(
            vec![2, 2, 1],
            0.05,
            vec![
                vec![vec![0.0], vec![0.0]],
                vec![vec![0.5, -0.25, 0.125], vec![1.0, 2.5e-7, -3.0]],
                vec![vec![0.75, -0.5, 0.1]],
            ],
        )
    }

    #[test]
    fn writes_expected_layout() {
        let text = sample().to_string();
        let expected = "3\n2 2 1 \n0.05\n\n\n\
            0.5 -0.25 0.125 \n1.0 2.5e-7 -3.0 \n\n\
            0.75 -0.5 0.1 \n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn reads_what_it_writes() {
        let backup = sample();
        let parsed: Backup = backup.to_string().parse().unwrap();
        assert_eq!(parsed, backup);
    }

    #[test]
    fn reads_java_style_text() {
        let text = "3\r\n2 2 1 \r\n0.05\r\n\r\n\r\n\
            0.5 -0.25 0.125 \r\n1.0 2.5E-7 -3.0 \r\n\r\n\
            0.75    -0.5\t0.1 \r\n\r\n";
        let parsed: Backup = text.parse().unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn input_layer_placeholder_is_rebuilt() {
        let parsed: Backup = "2\n3 1\n0.5\n1 2 3 4\n".parse().unwrap();
        assert_eq!(parsed.weights()[0], vec![vec![0.0]; 3]);
        assert_eq!(parsed.weights()[1], vec![vec![1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn premature_end_fails() {
        let err = "2\n3 1\n0.5\n1 2 3".parse::<Backup>().unwrap_err();
        assert!(matches!(err, BackupError::UnexpectedEnd("coefficient")));
    }

    #[test]
    fn oversized_header_fails() {
        let err = "2\n18446744073709551615 1\n0.1\n\n\n"
            .parse::<Backup>()
            .unwrap_err();
        assert!(matches!(err, BackupError::UnexpectedEnd("coefficient")));

        let err = "1\n18446744073709551615\n0.1\n".parse::<Backup>().unwrap_err();
        assert!(matches!(err, BackupError::Malformed { what: "layer count", .. }));
    }

    #[test]
    fn malformed_number_fails() {
        let err = "2\n3 1\n0.5\n1 2 x 4".parse::<Backup>().unwrap_err();
        match err {
            BackupError::Malformed { what, token } => {
                assert_eq!(what, "coefficient");
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn negative_size_fails() {
        let err = "2\n-3 1\n0.5\n".parse::<Backup>().unwrap_err();
        assert!(matches!(err, BackupError::Malformed { what: "layer size", .. }));
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Backup::read_from_file(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.txt");
        sample().save_to_file(&path).unwrap();
        assert_eq!(Backup::read_from_file(&path).unwrap(), sample());
    }
}
