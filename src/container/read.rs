//! container/read - позиционные чтения партиций, одиночные и пачкой (rayon).

use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::metrics::record_batch_read;

use super::core::{reader_lock, Container};

impl Container {
    /// Exactly `size[index]` bytes of partition `index`.
    pub fn read_partition(&self, index: usize) -> Result<Vec<u8>> {
        let _g = reader_lock(&self.path)?;
        let st = self.fresh_state()?;
        st.read_entry(index)
    }

    /// Read `indices` (all partitions when None) in parallel; output follows request
    /// order. The first failing index in request order fails the whole batch.
    pub fn read_partitions(&self, indices: Option<&[usize]>) -> Result<Vec<Vec<u8>>> {
        self.read_partitions_each(indices)?.into_iter().collect()
    }

    /// Like `read_partitions`, with one result per requested index.
    pub fn read_partitions_each(&self, indices: Option<&[usize]>) -> Result<Vec<Result<Vec<u8>>>> {
        let _g = reader_lock(&self.path)?;
        let st = self.fresh_state()?;

        let all: Vec<usize>;
        let wanted: &[usize] = match indices {
            Some(ix) => ix,
            None => {
                all = (0..st.meta.count()).collect();
                &all
            }
        };
        debug!("batch read of {} partition(s) from {}", wanted.len(), self.path.display());

        let state = &*st;
        let out: Vec<Result<Vec<u8>>> = wanted.par_iter().map(|&i| state.read_entry(i)).collect();
        record_batch_read();
        Ok(out)
    }
}
