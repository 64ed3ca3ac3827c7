/// Coarse-grained progress sink handed to kernels.
///
/// Kernels report how many outer-loop iterations are done out of how many
/// total; the sink rescales that into the 10..=95 percent band. A `none`
/// sink makes reporting a no-op.
pub struct Progress<'a> {
    sink: Option<&'a mut dyn FnMut(u8)>,
}

impl<'a> Progress<'a> {
    pub fn new(sink: &'a mut dyn FnMut(u8)) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn none() -> Progress<'static> {
        Progress { sink: None }
    }

    /// Report `done` of `total` outer-loop iterations complete.
    pub(crate) fn checkpoint(&mut self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            let pct = 10 + done * 85 / total;
            sink(pct.min(95) as u8);
        }
    }
}
