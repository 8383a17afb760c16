/// Training or test sample: an input vector and the desired output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct IORecord {
    inputs: Vec<f64>,
    outputs: Vec<f64>,
}

impl IORecord {
    pub fn new(inputs: Vec<f64>, outputs: Vec<f64>) -> Self {
        IORecord { inputs, outputs }
    }

    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.inputs, self.outputs)
    }
}

impl From<(Vec<f64>, Vec<f64>)> for IORecord {
    fn from((inputs, outputs): (Vec<f64>, Vec<f64>)) -> Self {
        IORecord::new(inputs, outputs)
    }
}
