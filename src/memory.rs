pub trait Addressable<T> {
    fn read(&self, address: usize) -> Option<T>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only instruction memory holding the program digits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Reads the (opcode, operand) pair at `ip`, or `None` once `ip` runs
    /// past the last complete pair.
    pub fn fetch(&self, ip: usize) -> Option<(u8, u8)> {
        Some((self.read(ip)?, self.read(ip.checked_add(1)?)?))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Addressable<u8> for Memory {
    fn read(&self, address: usize) -> Option<u8> {
        self.data.get(address).copied()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
