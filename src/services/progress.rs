/// Receives progress reports from the walker and the batch pipeline.
///
/// Reports are delivered synchronously from inside the scan loop; throttling and
/// moving them to a UI thread is the receiver's job.
pub trait ProgressSink<T> {
    fn report(&mut self, item: T);
}

impl<T, F> ProgressSink<T> for F
where
    F: FnMut(T),
{
    fn report(&mut self, item: T) {
        self(item)
    }
}
