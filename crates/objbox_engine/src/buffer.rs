//! Buffers handed out by the engine.

/// A byte buffer owned by the engine.
///
/// Call [`obx_bytes_free`] to release.
#[repr(C)]
#[derive(Debug)]
pub struct ObxBytes {
    /// Pointer to data.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl ObxBytes {
    /// Creates a buffer from a Vec.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let mut vec = vec.into_boxed_slice();
        let data = vec.as_mut_ptr();
        let len = vec.len();
        std::mem::forget(vec);

        Self {
            data,
            len,
            capacity: len,
        }
    }

    /// Creates an empty buffer.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Borrows the bytes.
    ///
    /// # Safety
    ///
    /// The buffer must have been created by the engine and not freed yet.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.data, self.len)
    }

    /// Converts back to a Vec, consuming the buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created from a Vec.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        Vec::from_raw_parts(self.data, self.len, self.capacity)
    }
}

/// An array of byte buffers owned by the engine.
///
/// Call [`obx_bytes_array_free`] to release the array and every item.
#[repr(C)]
#[derive(Debug)]
pub struct ObxBytesArray {
    /// Pointer to the first item.
    pub items: *mut ObxBytes,
    /// Number of items.
    pub count: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl ObxBytesArray {
    /// Creates an array from owned byte vectors.
    pub fn from_vecs(vecs: Vec<Vec<u8>>) -> Self {
        let mut items: Vec<ObxBytes> = vecs.into_iter().map(ObxBytes::from_vec).collect();
        let array = Self {
            items: items.as_mut_ptr(),
            count: items.len(),
            capacity: items.capacity(),
        };
        std::mem::forget(items);
        array
    }

    /// Creates an empty array.
    pub fn empty() -> Self {
        Self {
            items: std::ptr::null_mut(),
            count: 0,
            capacity: 0,
        }
    }

    /// Borrows the items.
    ///
    /// # Safety
    ///
    /// The array must have been created by the engine and not freed yet.
    pub unsafe fn as_slice(&self) -> &[ObxBytes] {
        if self.items.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.items, self.count)
    }
}

/// Frees a buffer allocated by the engine.
///
/// # Safety
///
/// The buffer must have been allocated by engine functions and not freed yet.
#[no_mangle]
pub unsafe extern "C" fn obx_bytes_free(bytes: ObxBytes) {
    drop(bytes.into_vec());
}

/// Frees a buffer array and all of its items.
///
/// # Safety
///
/// The array must have been allocated by engine functions and not freed yet.
#[no_mangle]
pub unsafe extern "C" fn obx_bytes_array_free(array: ObxBytesArray) {
    if array.items.is_null() {
        return;
    }
    let items = Vec::from_raw_parts(array.items, array.count, array.capacity);
    for item in items {
        drop(item.into_vec());
    }
}
