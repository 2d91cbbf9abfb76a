//! Record source shared by both decode passes, so inference and emission see
//! byte-for-byte the same records (key field included).

use textap_core::Record;
use textap_io::{Decoder, FileEntry};

use crate::error::ExecError;

pub struct RecordSource<'a> {
    decoder: &'a Decoder,
    rec_hash_keys: bool,
}

impl<'a> RecordSource<'a> {
    pub fn new(decoder: &'a Decoder, rec_hash_keys: bool) -> Self {
        Self {
            decoder,
            rec_hash_keys,
        }
    }

    /// Decode `file` and feed every record to `f`, in file order.
    pub fn for_each_record<F>(&self, stream: &str, file: &FileEntry, mut f: F) -> Result<u64, ExecError>
    where
        F: FnMut(Record) -> Result<(), ExecError>,
    {
        let decode_err = |source| ExecError::Decode {
            stream: stream.to_string(),
            path: file.absolute_path.clone(),
            source,
        };
        let records = self.decoder.open(&file.absolute_path).map_err(decode_err)?;
        let mut n = 0u64;
        for decoded in records {
            let rec = decoded.map_err(decode_err)?.into_record(self.rec_hash_keys);
            f(rec)?;
            n += 1;
        }
        Ok(n)
    }
}
