use goblin::elf32::{
    header::{EI_CLASS, EI_DATA, ELFCLASS32, ELFDATA2LSB, ELFMAG, Header, SELFMAG},
    program_header::{PT_LOAD, ProgramHeader, SIZEOF_PHDR},
};
use log::{debug, trace};
use scroll::{LE, Pread};

use crate::MalformedImage;

/// 放入执行区的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    /// 入口相对执行区起点的偏移
    pub entry: usize,
    /// 装载范围的长度
    pub span: usize,
}

/// 把映像放入`arena`：非 ELF 按扁平二进制整体复制，ELF 按段装载
pub fn place(image: &[u8], arena: &mut [u8]) -> Result<Placed, MalformedImage> {
    if image.is_empty() {
        return Err(MalformedImage::Empty);
    }
    if image.len() >= SELFMAG && &image[..SELFMAG] == ELFMAG {
        return place_elf(image, arena);
    }

    if image.len() > arena.len() {
        return Err(MalformedImage::SpanTooLarge);
    }
    arena[..image.len()].copy_from_slice(image);
    arena[image.len()..].fill(0);
    debug!("loader: flat image, {} bytes", image.len());
    Ok(Placed {
        entry: 0,
        span: image.len(),
    })
}

fn place_elf(image: &[u8], arena: &mut [u8]) -> Result<Placed, MalformedImage> {
    let header: Header = image
        .pread_with(0, LE)
        .map_err(|_| MalformedImage::HeaderOutOfBounds)?;

    if header.e_ident[EI_CLASS] != ELFCLASS32 {
        return Err(MalformedImage::BadClass);
    }
    if header.e_ident[EI_DATA] != ELFDATA2LSB {
        return Err(MalformedImage::BadEncoding);
    }

    let table = ProgramHeaders::new(image, &header)?;

    // 各段的装载范围
    let mut bounds: Option<(u32, u32)> = None;
    for ph in table.loadable() {
        let ph = ph?;
        let end = ph
            .p_vaddr
            .checked_add(ph.p_memsz)
            .ok_or(MalformedImage::SegmentOutOfBounds)?;
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(ph.p_vaddr), max.max(end)),
            None => (ph.p_vaddr, end),
        });
    }
    let (min, max) = bounds.ok_or(MalformedImage::NoLoadableSegment)?;

    let span = (max - min) as usize;
    if span > arena.len() {
        return Err(MalformedImage::SpanTooLarge);
    }
    if !(min..max).contains(&header.e_entry) {
        return Err(MalformedImage::EntryOutOfRange);
    }

    // 清零整个范围，未由文件填充的部分即为 BSS
    arena[..span].fill(0);
    for ph in table.loadable() {
        let ph = ph?;
        let src = ph.p_offset as usize..(ph.p_offset + ph.p_filesz) as usize;
        let dst = (ph.p_vaddr - min) as usize;
        trace!(
            "loader: segment {:#x}+{:#x} <- file {src:?}",
            ph.p_vaddr, ph.p_memsz
        );
        arena[dst..dst + src.len()].copy_from_slice(&image[src]);
    }

    debug!("loader: ELF span {min:#x}..{max:#x}, entry {:#x}", header.e_entry);
    Ok(Placed {
        entry: (header.e_entry - min) as usize,
        span,
    })
}

/// 已确认整体落在文件内的程序头表
struct ProgramHeaders<'a> {
    image: &'a [u8],
    offset: usize,
    entry_size: usize,
    count: usize,
}

impl<'a> ProgramHeaders<'a> {
    fn new(image: &'a [u8], header: &Header) -> Result<Self, MalformedImage> {
        let offset = header.e_phoff as usize;
        let entry_size = header.e_phentsize as usize;
        let count = header.e_phnum as usize;

        if entry_size < SIZEOF_PHDR {
            return Err(MalformedImage::HeaderOutOfBounds);
        }
        count
            .checked_mul(entry_size)
            .and_then(|len| len.checked_add(offset))
            .filter(|&end| end <= image.len())
            .ok_or(MalformedImage::HeaderOutOfBounds)?;

        Ok(Self {
            image,
            offset,
            entry_size,
            count,
        })
    }

    /// 非空的 PT_LOAD 段，逐个校验其文件内容的范围
    fn loadable(&self) -> impl Iterator<Item = Result<ProgramHeader, MalformedImage>> + '_ {
        (0..self.count)
            .map(|i| {
                self.image
                    .pread_with::<ProgramHeader>(self.offset + i * self.entry_size, LE)
                    .map_err(|_| MalformedImage::HeaderOutOfBounds)
            })
            .filter(|ph| {
                ph.as_ref()
                    .map_or(true, |ph| ph.p_type == PT_LOAD && ph.p_memsz > 0)
            })
            .map(|ph| {
                let ph = ph?;
                let file_end = ph
                    .p_offset
                    .checked_add(ph.p_filesz)
                    .filter(|&end| end as usize <= self.image.len());
                if ph.p_filesz > ph.p_memsz || file_end.is_none() {
                    return Err(MalformedImage::SegmentOutOfBounds);
                }
                Ok(ph)
            })
    }
}
